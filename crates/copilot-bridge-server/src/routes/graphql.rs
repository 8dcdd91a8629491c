use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header::CONTENT_TYPE, request::Parts, Method, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use copilot_bridge::{classify, BridgeError, Route};
use serde_json::json;

/// Error responses carry the status and body the bridge chose for the failure
struct ErrorResponse(BridgeError);

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(self.0.body())).into_response()
    }
}

/// Only POSTs with a JSON (or unspecified) content type can carry a GraphQL call
fn may_be_graphql(parts: &Parts) -> bool {
    if parts.method != Method::POST {
        return false;
    }
    match parts.headers.get(CONTENT_TYPE).map(|v| v.to_str()) {
        None => true,
        Some(Ok(content_type)) => {
            let mime = content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        }
        Some(Err(_)) => false,
    }
}

async fn handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    if !may_be_graphql(&parts) {
        let body = reqwest::Body::wrap_stream(body.into_data_stream());
        return state.proxy.forward(parts, body).await;
    }

    // Buffered bodies are capped; streamed passthrough bodies are not
    let body = match to_bytes(body, state.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Failed to read request body", "status": 400 })),
            )
                .into_response();
        }
    };

    match classify(parts.method.as_str(), &body) {
        Route::Operation(operation, request) => {
            tracing::info!("Handling {}", operation.name());
            match state.bridge.execute(operation, &request).await {
                Ok(response) => Json(response).into_response(),
                Err(e) => ErrorResponse(e).into_response(),
            }
        }
        Route::Unsupported(name) => {
            tracing::warn!("Rejecting unsupported operation {}", name);
            ErrorResponse(BridgeError::UnsupportedOperation(name)).into_response()
        }
        Route::Passthrough => state.proxy.forward(parts, body).await,
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new().fallback(handler).with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::proxy::RuntimeProxy;
    use axum::http::Request;
    use copilot_bridge::backend::HttpAgentBackend;
    use copilot_bridge::CopilotBridge;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Upstreams {
        agent: MockServer,
        runtime: MockServer,
    }

    impl Upstreams {
        async fn start() -> Self {
            Self {
                agent: MockServer::start().await,
                runtime: MockServer::start().await,
            }
        }

        fn app(&self) -> Router {
            let backend =
                HttpAgentBackend::new(&self.agent.uri(), Duration::from_secs(5)).unwrap();
            let state = AppState::new(
                CopilotBridge::new(Arc::new(backend)),
                RuntimeProxy::new(&self.runtime.uri()).unwrap(),
                1024 * 1024,
            );
            routes(state)
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_copilot_response() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(concat!(
                        "data: {\"type\":\"TEXT_MESSAGE_START\",\"messageId\":\"r1\",\"role\":\"assistant\"}\n\n",
                        "data: {\"type\":\"TEXT_MESSAGE_CONTENT\",\"messageId\":\"r1\",\"delta\":\"Hi\"}\n\n",
                        "data: {\"type\":\"TEXT_MESSAGE_CONTENT\",\"messageId\":\"r1\",\"delta\":\" there\"}\n\n",
                        "data: {\"type\":\"TEXT_MESSAGE_END\",\"messageId\":\"r1\"}\n\n",
                    )),
            )
            .expect(1)
            .mount(&upstreams.agent)
            .await;

        let response = upstreams
            .app()
            .oneshot(post_json(
                "/api/copilotkit",
                json!({
                    "operationName": "generateCopilotResponse",
                    "variables": {
                        "data": {
                            "threadId": "t1",
                            "messages": [{"id": "m1", "textMessage": {"role": "user", "content": "hello"}}]
                        }
                    }
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        let envelope = &body["data"]["generateCopilotResponse"];
        assert_eq!(envelope["threadId"], "t1");
        assert_eq!(envelope["messages"][0]["id"], "r1");
        assert_eq!(envelope["messages"][0]["content"], json!(["Hi there"]));
    }

    #[tokio::test]
    async fn test_upstream_error_passes_through() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/agent"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&upstreams.agent)
            .await;

        let response = upstreams
            .app()
            .oneshot(post_json(
                "/api/copilotkit",
                json!({"operationName": "generateCopilotResponse", "variables": {"data": {}}}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn test_unknown_operation_is_rejected() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstreams.agent)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstreams.runtime)
            .await;

        let response = upstreams
            .app()
            .oneshot(post_json(
                "/api/copilotkit",
                json!({"operationName": "someUnknownOp", "query": "query someUnknownOp { x }"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Unsupported operation: someUnknownOp");
    }

    #[tokio::test]
    async fn test_missing_variables_is_client_error() {
        let upstreams = Upstreams::start().await;

        let response = upstreams
            .app()
            .oneshot(post_json(
                "/api/copilotkit",
                json!({"operationName": "generateCopilotResponse", "variables": null}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await["status"], 400);
    }

    #[tokio::test]
    async fn test_available_agents() {
        let upstreams = Upstreams::start().await;

        let response = upstreams
            .app()
            .oneshot(post_json(
                "/api/copilotkit",
                json!({"query": "query availableAgents { availableAgents { agents { name id } } }"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            read_json(response).await,
            json!({"data": {"availableAgents": {"agents": []}}})
        );
    }

    #[tokio::test]
    async fn test_other_calls_are_proxied() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("GET"))
            .and(path("/api/copilotkit/info"))
            .and(header("x-client", "map-ui"))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("x-runtime", "yes")
                    .set_body_json(json!({"version": "1.0"})),
            )
            .expect(1)
            .mount(&upstreams.runtime)
            .await;

        let request = Request::builder()
            .method("GET")
            .uri("/api/copilotkit/info")
            .header("host", "bridge.local")
            .header("x-client", "map-ui")
            .body(Body::empty())
            .unwrap();
        let response = upstreams.app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(response.headers()["x-runtime"], "yes");
        assert!(response.headers().get("content-length").is_none());
        assert_eq!(read_json(response).await, json!({"version": "1.0"}));

        let received = upstreams.runtime.received_requests().await.unwrap();
        assert_ne!(
            received[0].headers.get("host").map(|h| h.to_str().unwrap_or_default()),
            Some("bridge.local")
        );
    }

    #[tokio::test]
    async fn test_non_graphql_post_is_proxied_with_body() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/api/export"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&upstreams.runtime)
            .await;

        let response = upstreams
            .app()
            .oneshot(post_json("/api/export", json!({"format": "pdf"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let received = upstreams.runtime.received_requests().await.unwrap();
        let forwarded: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(forwarded, json!({"format": "pdf"}));
    }

    #[tokio::test]
    async fn test_large_upload_streams_past_body_limit() {
        let upstreams = Upstreams::start().await;
        Mock::given(method("POST"))
            .and(path("/api/upload"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&upstreams.runtime)
            .await;

        let upload = vec![7u8; 2 * 1024 * 1024];
        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "application/octet-stream")
            .body(Body::from(upload.clone()))
            .unwrap();
        let response = upstreams.app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let received = upstreams.runtime.received_requests().await.unwrap();
        assert_eq!(received[0].body, upload);
    }

    #[test]
    fn test_only_json_posts_are_buffered() {
        let parts = |method: &str, content_type: Option<&str>| {
            let mut builder = Request::builder().method(method).uri("/api/copilotkit");
            if let Some(content_type) = content_type {
                builder = builder.header("content-type", content_type);
            }
            builder.body(()).unwrap().into_parts().0
        };

        assert!(may_be_graphql(&parts("POST", Some("application/json"))));
        assert!(may_be_graphql(&parts("POST", Some("Application/JSON; charset=utf-8"))));
        assert!(may_be_graphql(&parts("POST", Some("application/graphql-response+json"))));
        assert!(may_be_graphql(&parts("POST", None)));
        assert!(!may_be_graphql(&parts("POST", Some("multipart/form-data; boundary=x"))));
        assert!(!may_be_graphql(&parts("GET", Some("application/json"))));
    }
}
