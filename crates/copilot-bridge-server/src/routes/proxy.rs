use axum::{
    body::Body,
    http::{
        header::{ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, HOST, TRANSFER_ENCODING},
        request::Parts,
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use futures::TryStreamExt;
use reqwest::Client;
use serde_json::json;

/// Headers that describe the upstream connection rather than the payload
const HOP_HEADERS: [axum::http::HeaderName; 3] = [TRANSFER_ENCODING, CONTENT_LENGTH, CONTENT_ENCODING];

/// Forwards calls the bridge does not handle to the copilot runtime, untouched
#[derive(Clone)]
pub struct RuntimeProxy {
    client: Client,
    target: String,
}

impl RuntimeProxy {
    pub fn new(target: &str) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            target: target.trim_end_matches('/').to_string(),
        })
    }

    fn url_for(&self, parts: &Parts) -> String {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        format!("{}{}", self.target, path)
    }

    pub async fn forward<B: Into<reqwest::Body>>(&self, parts: Parts, body: B) -> Response {
        let url = self.url_for(&parts);
        tracing::debug!("Proxying {} {}", parts.method, url);

        let mut headers = parts.headers;
        headers.remove(HOST);
        // The outgoing body is framed by the client, not by the caller
        headers.remove(TRANSFER_ENCODING);
        // Upstream bodies are relayed without their content-encoding header,
        // so they must arrive unencoded.
        headers.remove(ACCEPT_ENCODING);

        let upstream = match self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to reach runtime at {}: {}", url, e);
                return (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "Failed to reach copilot runtime" })),
                )
                    .into_response();
            }
        };

        let status = upstream.status();
        let headers = relayed_headers(upstream.headers());
        let body = Body::from_stream(upstream.bytes_stream().map_err(|e| {
            tracing::warn!("Runtime response stream failed: {}", e);
            e
        }));

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn relayed_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = upstream.clone();
    for name in HOP_HEADERS {
        headers.remove(name);
    }
    headers
}
