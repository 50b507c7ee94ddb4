//! JSON shapes exchanged with the Claude messages endpoint.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WireRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub content: Vec<WireContent>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

/// A content block. Its `type` is not inspected; only text is surfaced.
#[derive(Debug, Deserialize)]
pub(crate) struct WireContent {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// One `data:` payload of the event stream.
#[derive(Debug, Deserialize)]
pub(crate) struct WireStreamEvent {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub delta: Option<WireDelta>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireDelta {
    #[serde(default)]
    pub text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_optionals_are_omitted() {
        let req = WireRequest {
            model: "claude-sonnet-4-5".to_string(),
            messages: vec![WireMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            system: None,
            max_tokens: 1024,
            temperature: None,
            top_p: None,
            stream: false,
        };
        let v = serde_json::to_value(&req).expect("serialize");
        assert_eq!(
            v,
            json!({
                "model": "claude-sonnet-4-5",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 1024,
                "stream": false
            })
        );
    }

    #[test]
    fn response_tolerates_missing_fields() {
        let parsed: WireResponse = serde_json::from_str("{}").expect("parse");
        assert!(parsed.id.is_none());
        assert!(parsed.content.is_empty());
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn stream_event_without_delta_parses() {
        let parsed: WireStreamEvent =
            serde_json::from_str(r#"{"type":"message_stop"}"#).expect("parse");
        assert_eq!(parsed.kind.as_deref(), Some("message_stop"));
        assert!(parsed.delta.is_none());
    }
}
