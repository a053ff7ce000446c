//! Request parsing and the responses-API wire schema.
//!
//! Incoming bodies may carry the query as a chat `messages` list, a
//! responses-style `input` list, or a flat `prompt`. Replies are either a
//! single [`ResponseObject`] or the fixed five-record [`StreamEvent`]
//! sequence.

use serde::Serialize;
use serde_json::Value;

/// Query used when the body carries none of the recognised shapes.
pub const UNKNOWN_QUERY: &str = "unknown";

/// Placeholder usage figures reported on completed responses.
pub const PLACEHOLDER_USAGE: Usage = Usage {
    input_tokens: 10,
    output_tokens: 10,
    total_tokens: 20,
};

const ZERO_USAGE: Usage = Usage {
    input_tokens: 0,
    output_tokens: 0,
    total_tokens: 0,
};

/// Pulls the user's query out of a request body.
pub fn extract_query(body: &Value) -> String {
    if let Some(messages) = body.get("messages") {
        return messages
            .as_array()
            .and_then(|m| m.last())
            .map(|last| content_text(last.get("content")))
            .unwrap_or_else(|| UNKNOWN_QUERY.to_string());
    }

    if let Some(input) = body.get("input") {
        return match input {
            Value::Array(items) => items
                .last()
                .map(|last| content_text(last.get("content")))
                .unwrap_or_else(|| UNKNOWN_QUERY.to_string()),
            Value::String(s) => s.clone(),
            _ => UNKNOWN_QUERY.to_string(),
        };
    }

    match body.get("prompt") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => UNKNOWN_QUERY.to_string(),
    }
}

/// Flattens a message `content` field to text. Lists of typed parts keep
/// only `input_text` and `output_text` parts.
fn content_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter(|p| {
                matches!(
                    p.get("type").and_then(Value::as_str),
                    Some("input_text") | Some("output_text")
                )
            })
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect(),
        Some(other) => other.to_string(),
    }
}

/// Model name from the request, or `default` when absent.
pub fn request_model(body: &Value, default: &str) -> String {
    body.get("model")
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// Whether the request asks for an event stream.
pub fn wants_stream(body: &Value) -> bool {
    body.get("stream").and_then(Value::as_bool).unwrap_or(false)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

impl ContentPart {
    fn output_text(text: &str) -> Self {
        Self {
            kind: "output_text",
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub role: &'static str,
    pub content: Vec<ContentPart>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
}

impl OutputItem {
    fn message(id: &str, content: Vec<ContentPart>, status: Option<&'static str>) -> Self {
        Self {
            kind: "message",
            id: id.to_string(),
            role: "assistant",
            content,
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseObject {
    pub id: String,
    pub object: &'static str,
    pub created_at: i64,
    pub status: &'static str,
    pub model: String,
    pub output: Vec<OutputItem>,
    pub usage: Usage,
}

/// Identifiers and timestamp shared by every record of one response.
#[derive(Debug, Clone)]
pub struct ResponseIds {
    pub response_id: String,
    pub item_id: String,
    pub created_at: i64,
}

impl ResponseIds {
    pub fn at(created_at: i64) -> Self {
        Self {
            response_id: format!("resp_{}", created_at),
            item_id: format!("msg_{}", created_at),
            created_at,
        }
    }

    pub fn now() -> Self {
        Self::at(chrono::Utc::now().timestamp())
    }

    fn response(
        &self,
        model: &str,
        status: &'static str,
        output: Vec<OutputItem>,
        usage: Usage,
    ) -> ResponseObject {
        ResponseObject {
            id: self.response_id.clone(),
            object: "response",
            created_at: self.created_at,
            status,
            model: model.to_string(),
            output,
            usage,
        }
    }
}

/// The complete, non-streaming response.
pub fn completed_response(reply: &str, model: &str, ids: &ResponseIds) -> ResponseObject {
    let item = OutputItem::message(&ids.item_id, vec![ContentPart::output_text(reply)], None);
    ids.response(model, "completed", vec![item], PLACEHOLDER_USAGE)
}

/// One record of the event stream, tagged by its `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    #[serde(rename = "response.created")]
    Created { response: ResponseObject },
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded { output_index: u32, item: OutputItem },
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        item_id: String,
        output_index: u32,
        content_index: u32,
        delta: String,
    },
    #[serde(rename = "response.output_item.done")]
    OutputItemDone { output_index: u32, item: OutputItem },
    #[serde(rename = "response.completed")]
    Completed { response: ResponseObject },
}

/// The fixed event sequence for `reply`. The whole reply travels in a
/// single delta.
pub fn stream_events(reply: &str, model: &str, ids: &ResponseIds) -> Vec<StreamEvent> {
    vec![
        StreamEvent::Created {
            response: ids.response(model, "in_progress", Vec::new(), ZERO_USAGE),
        },
        StreamEvent::OutputItemAdded {
            output_index: 0,
            item: OutputItem::message(&ids.item_id, Vec::new(), Some("in_progress")),
        },
        StreamEvent::OutputTextDelta {
            item_id: ids.item_id.clone(),
            output_index: 0,
            content_index: 0,
            delta: reply.to_string(),
        },
        StreamEvent::OutputItemDone {
            output_index: 0,
            item: OutputItem::message(
                &ids.item_id,
                vec![ContentPart::output_text(reply)],
                Some("completed"),
            ),
        },
        StreamEvent::Completed {
            response: ids.response(model, "completed", Vec::new(), PLACEHOLDER_USAGE),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_from_last_message() {
        let body = json!({
            "messages": [
                {"role": "user", "content": "第一句"},
                {"role": "user", "content": "押金怎么退"}
            ]
        });
        assert_eq!(extract_query(&body), "押金怎么退");
    }

    #[test]
    fn test_query_from_input_parts() {
        let body = json!({
            "input": [
                {"role": "user", "content": "ignored"},
                {"role": "user", "content": [
                    {"type": "input_text", "text": "异地"},
                    {"type": "input_image", "image_url": "http://x"},
                    {"type": "output_text", "text": "还车"}
                ]}
            ]
        });
        assert_eq!(extract_query(&body), "异地还车");
    }

    #[test]
    fn test_query_from_input_string_content() {
        let body = json!({"input": [{"role": "user", "content": "保险"}]});
        assert_eq!(extract_query(&body), "保险");
    }

    #[test]
    fn test_query_from_prompt() {
        assert_eq!(extract_query(&json!({"prompt": "故障"})), "故障");
    }

    #[test]
    fn test_unrecognised_body_uses_placeholder() {
        assert_eq!(extract_query(&json!({"foo": 1})), "unknown");
        assert_eq!(extract_query(&json!({"messages": []})), "unknown");
        assert_eq!(extract_query(&Value::Null), "unknown");
    }

    #[test]
    fn test_messages_take_precedence_over_prompt() {
        let body = json!({"prompt": "p", "messages": [{"content": "m"}]});
        assert_eq!(extract_query(&body), "m");
    }

    #[test]
    fn test_completed_response_shape() {
        let ids = ResponseIds::at(1_700_000_000);
        let value = serde_json::to_value(completed_response("答复", "mock-model", &ids)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "resp_1700000000",
                "object": "response",
                "created_at": 1_700_000_000,
                "status": "completed",
                "model": "mock-model",
                "output": [{
                    "type": "message",
                    "id": "msg_1700000000",
                    "role": "assistant",
                    "content": [{"type": "output_text", "text": "答复"}]
                }],
                "usage": {"input_tokens": 10, "output_tokens": 10, "total_tokens": 20}
            })
        );
    }

    #[test]
    fn test_stream_has_five_events_in_order() {
        let ids = ResponseIds::at(42);
        let reply = "第一行\n\"引号\"";
        let events = stream_events(reply, "m", &ids);
        let values: Vec<Value> = events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap())
            .collect();
        let types: Vec<&str> = values.iter().map(|v| v["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec![
                "response.created",
                "response.output_item.added",
                "response.output_text.delta",
                "response.output_item.done",
                "response.completed",
            ]
        );

        let delta = &values[2];
        assert_eq!(delta["type"], "response.output_text.delta");
        assert_eq!(delta["delta"], reply);
        assert_eq!(delta["item_id"], "msg_42");

        let created = &values[0];
        assert_eq!(created["response"]["status"], "in_progress");
        assert_eq!(created["response"]["usage"]["total_tokens"], 0);

        let done = &values[3];
        assert_eq!(done["item"]["content"][0]["text"], reply);
        assert_eq!(done["item"]["status"], "completed");

        let completed = &values[4];
        assert_eq!(completed["response"]["usage"]["total_tokens"], 20);
    }
}
