use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::aggregator::{Aggregation, MessageAccumulator, ToolCallAccumulator};

fn success_status() -> Value {
    json!({
        "code": "success",
        "__typename": "SuccessMessageStatus"
    })
}

fn text_output(message: &MessageAccumulator, created_at: &str) -> Value {
    json!({
        "__typename": "TextMessageOutput",
        "id": message.id,
        "createdAt": created_at,
        "role": message.role,
        "content": [message.content()],
        "status": success_status(),
    })
}

fn action_output(call: &ToolCallAccumulator, created_at: &str) -> Value {
    json!({
        "__typename": "ActionExecutionMessageOutput",
        "id": call.id,
        "createdAt": created_at,
        "name": call.name,
        "arguments": [call.arguments()],
        "parentMessageId": call.parent_message_id,
        "status": success_status(),
    })
}

/// Build the `generateCopilotResponse` reply. Text messages are listed before tool
/// calls, each group in the order the agent started them.
pub fn assemble(
    thread_id: &str,
    run_id: &str,
    aggregation: &Aggregation,
    created_at: DateTime<Utc>,
) -> Value {
    let created_at = created_at.to_rfc3339_opts(SecondsFormat::Millis, true);

    let messages: Vec<Value> = aggregation
        .messages
        .iter()
        .map(|message| text_output(message, &created_at))
        .chain(
            aggregation
                .tool_calls
                .iter()
                .map(|call| action_output(call, &created_at)),
        )
        .collect();

    json!({
        "data": {
            "generateCopilotResponse": {
                "__typename": "CopilotResponse",
                "threadId": thread_id,
                "runId": run_id,
                "status": {
                    "code": "success",
                    "__typename": "BaseResponseStatus"
                },
                "messages": messages,
                "extensions": {},
                "metaEvents": []
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_text_before_tool_calls() {
        let aggregation = Aggregation {
            messages: vec![MessageAccumulator {
                id: "r1".into(),
                role: "assistant".into(),
                parts: vec!["Hi".into(), " there".into()],
                finished: true,
            }],
            tool_calls: vec![ToolCallAccumulator {
                id: "c1".into(),
                name: "search".into(),
                parent_message_id: Some("r1".into()),
                parts: vec!["{\"q\":".into(), "1}".into()],
                finished: true,
            }],
        };

        let response = assemble("t1", "run-1", &aggregation, created_at());
        let envelope = &response["data"]["generateCopilotResponse"];

        assert_eq!(envelope["threadId"], "t1");
        assert_eq!(envelope["runId"], "run-1");
        assert_eq!(envelope["status"]["code"], "success");
        assert_eq!(envelope["extensions"], json!({}));
        assert_eq!(envelope["metaEvents"], json!([]));

        let messages = envelope["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["__typename"], "TextMessageOutput");
        assert_eq!(messages[0]["content"], json!(["Hi there"]));
        assert_eq!(messages[0]["createdAt"], "2024-05-01T12:00:00.000Z");
        assert_eq!(messages[1]["__typename"], "ActionExecutionMessageOutput");
        assert_eq!(messages[1]["arguments"], json!(["{\"q\":1}"]));
        assert_eq!(messages[1]["parentMessageId"], "r1");
        assert_eq!(messages[1]["status"]["code"], "success");
    }

    #[test]
    fn test_empty_aggregation() {
        let response = assemble("t1", "run-1", &Aggregation::default(), created_at());
        assert_eq!(
            response["data"]["generateCopilotResponse"]["messages"],
            json!([])
        );
    }
}
