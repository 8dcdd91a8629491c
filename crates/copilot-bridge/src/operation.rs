use serde_json::Value;

use crate::models::graphql::GraphQlRequest;

/// The GraphQL operations the bridge answers itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    AvailableAgents,
    LoadAgentState,
    GenerateCopilotResponse,
}

impl Operation {
    /// Order matters for the query scan: a `generateCopilotResponse` document can
    /// mention other operation names in its selection set, never the reverse.
    const ALL: [Operation; 3] = [
        Operation::GenerateCopilotResponse,
        Operation::LoadAgentState,
        Operation::AvailableAgents,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::AvailableAgents => "availableAgents",
            Operation::LoadAgentState => "loadAgentState",
            Operation::GenerateCopilotResponse => "generateCopilotResponse",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Heuristic: look for an operation name anywhere in the raw query text.
    /// Client query documents vary too much to match on exact text.
    fn scan_query(query: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| query.contains(op.name()))
    }
}

/// Where an inbound call should go
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// One of the operations the bridge translates
    Operation(Operation, GraphQlRequest),
    /// A GraphQL call for an operation the bridge does not know
    Unsupported(String),
    /// Not a GraphQL call at all; forward it untouched
    Passthrough,
}

/// Decide what to do with an inbound call from its method and raw body.
pub fn classify(method: &str, body: &[u8]) -> Route {
    if !method.eq_ignore_ascii_case("POST") {
        return Route::Passthrough;
    }
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return Route::Passthrough;
    };
    let Some(request) = GraphQlRequest::from_value(&value) else {
        return Route::Passthrough;
    };

    let by_name = request.operation_name.as_deref().and_then(Operation::from_name);
    let by_query = || request.query.as_deref().and_then(Operation::scan_query);

    match by_name.or_else(by_query) {
        Some(operation) => Route::Operation(operation, request),
        None => {
            let name = request
                .operation_name
                .clone()
                .unwrap_or_else(|| "anonymous".to_string());
            Route::Unsupported(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn operation(route: Route) -> Option<Operation> {
        match route {
            Route::Operation(op, _) => Some(op),
            _ => None,
        }
    }

    #[test]
    fn test_operation_name_match() {
        let route = classify(
            "POST",
            &body(json!({"operationName": "loadAgentState", "variables": {}})),
        );
        assert_eq!(operation(route), Some(Operation::LoadAgentState));
    }

    #[test]
    fn test_query_scan_fallback() {
        let route = classify(
            "post",
            &body(json!({
                "query": "mutation Chat($data: GenerateCopilotResponseInput!) { generateCopilotResponse(data: $data) { threadId } }",
                "operationName": "Chat"
            })),
        );
        assert_eq!(operation(route), Some(Operation::GenerateCopilotResponse));

        let route = classify("POST", &body(json!({"query": "query { availableAgents { agents { id } } }"})));
        assert_eq!(operation(route), Some(Operation::AvailableAgents));
    }

    #[test]
    fn test_unknown_operation_is_unsupported() {
        let route = classify("POST", &body(json!({"operationName": "someUnknownOp"})));
        assert_eq!(route, Route::Unsupported("someUnknownOp".into()));

        let route = classify("POST", &body(json!({"query": "query { viewer { id } }"})));
        assert_eq!(route, Route::Unsupported("anonymous".into()));
    }

    #[test]
    fn test_non_graphql_calls_pass_through() {
        assert_eq!(classify("GET", b""), Route::Passthrough);
        assert_eq!(
            classify("GET", &body(json!({"operationName": "availableAgents"}))),
            Route::Passthrough
        );
        assert_eq!(classify("POST", b"not json"), Route::Passthrough);
        assert_eq!(classify("POST", &body(json!({"prompt": "hi"}))), Route::Passthrough);
        assert_eq!(classify("POST", &body(json!([1, 2, 3]))), Route::Passthrough);
    }
}
