//! Request/response contract shared by the HTTP adapter and the CLI.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::analysis::Analysis;
use crate::bank::{FAILURE_ERROR, FAILURE_REPLY};

/// One trainee turn. `history` is the flattened transcript so far, one turn
/// per line, ideally including the markers returned by earlier replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub history: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Ask for the [`Analysis`] block alongside the reply.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub structured: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, history: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: history.into(),
            persona: None,
            structured: false,
        }
    }

    /// Lenient reading of an arbitrary JSON value. Anything that is not an
    /// object (or a string holding one) becomes an empty request; fields of
    /// the wrong type fall back to their defaults.
    pub fn from_value(value: Value) -> Self {
        let object = match value {
            Value::Object(map) => map,
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => map,
                _ => return Self::default(),
            },
            _ => return Self::default(),
        };
        let text = |key: &str| match object.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };
        Self {
            message: text("message").unwrap_or_default(),
            history: text("history").unwrap_or_default(),
            persona: text("persona"),
            structured: text("structured").is_some_and(|flag| flag.trim().eq_ignore_ascii_case("true")),
        }
    }

    /// Lenient reading of a raw request body.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice::<Value>(body)
            .map(Self::from_value)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub ok: bool,
    pub reply: String,
    /// True once the trainee has stated the correct resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
    /// State marker to append to the next request's history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Analysis>,
}

impl ChatResponse {
    pub fn reply(reply: String, done: bool, marker: String) -> Self {
        Self {
            ok: true,
            reply,
            done: Some(done),
            marker: Some(marker),
            error: None,
            analysis: None,
        }
    }

    /// Well-formed answer for an internal fault.
    pub fn failure() -> Self {
        Self {
            ok: false,
            reply: FAILURE_REPLY.to_string(),
            done: None,
            marker: None,
            error: Some(FAILURE_ERROR.to_string()),
            analysis: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_value_accepts_well_formed_objects() {
        let request = ChatRequest::from_value(json!({
            "message": "hi",
            "history": "Betty: hello",
            "persona": "Freda"
        }));
        assert_eq!(request.message, "hi");
        assert_eq!(request.history, "Betty: hello");
        assert_eq!(request.persona.as_deref(), Some("Freda"));
    }

    #[test]
    fn from_value_tolerates_bad_shapes() {
        assert_eq!(ChatRequest::from_value(json!([1, 2])), ChatRequest::default());
        assert_eq!(ChatRequest::from_value(json!(null)), ChatRequest::default());
        let odd = ChatRequest::from_value(json!({ "message": 42, "history": ["x"] }));
        assert_eq!(odd.message, "42");
        assert_eq!(odd.history, "");
    }

    #[test]
    fn structured_flag_is_read_leniently() {
        assert!(ChatRequest::from_value(json!({ "message": "hi", "structured": true })).structured);
        assert!(ChatRequest::from_value(json!({ "structured": "TRUE" })).structured);
        assert!(!ChatRequest::from_value(json!({ "structured": "yes please" })).structured);
        assert!(!ChatRequest::from_value(json!({ "structured": 1 })).structured);
        assert!(!ChatRequest::from_value(json!({ "message": "hi" })).structured);

        let plain = serde_json::to_value(ChatRequest::new("hi", "")).unwrap();
        assert!(plain.get("structured").is_none());
    }

    #[test]
    fn string_encoded_json_is_unwrapped() {
        let body = serde_json::to_vec(&json!("{\"message\":\"hello\"}")).unwrap();
        assert_eq!(ChatRequest::from_body(&body).message, "hello");
        assert_eq!(ChatRequest::from_body(b"not json"), ChatRequest::default());
    }

    #[test]
    fn failure_shape_omits_success_fields() {
        let value = serde_json::to_value(ChatResponse::failure()).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["error"], json!(FAILURE_ERROR));
        assert!(value.get("done").is_none());
        assert!(value.get("marker").is_none());
        assert!(value.get("analysis").is_none());
    }
}
