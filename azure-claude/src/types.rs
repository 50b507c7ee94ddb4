use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    /// Non-text attachment. Carried for callers, never sent to the model.
    Uri {
        uri: String,
        #[serde(default)]
        media_type: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub contents: Vec<MessageContent>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            contents: vec![MessageContent::Text { text: text.into() }],
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Text parts joined with `\n`; non-text parts are skipped.
    pub fn text(&self) -> String {
        let parts: Vec<&str> = self
            .contents
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.as_str()),
                MessageContent::Uri { .. } => None,
            })
            .collect();
        parts.join("\n")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Defaults to 1024 on the wire.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub top_p: Option<f32>,
}

impl ChatOptions {
    pub fn with_max_output_tokens(mut self, v: u32) -> Self {
        self.max_output_tokens = Some(v);
        self
    }

    pub fn with_temperature(mut self, v: f32) -> Self {
        self.temperature = Some(v);
        self
    }

    pub fn with_top_p(mut self, v: f32) -> Self {
        self.top_p = Some(v);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDetails {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletion {
    pub completion_id: Option<String>,
    pub model_id: Option<String>,
    pub message: ChatMessage,
    pub finish_reason: Option<FinishReason>,
    pub usage: UsageDetails,
}

impl ChatCompletion {
    pub fn text(&self) -> String {
        self.message.text()
    }
}

/// One incremental piece of a streamed completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingUpdate {
    pub role: Role,
    pub text: Option<String>,
    pub finish_reason: Option<FinishReason>,
}

impl StreamingUpdate {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: Some(text.into()),
            finish_reason: None,
        }
    }

    pub fn finished(reason: FinishReason) -> Self {
        Self {
            role: Role::Assistant,
            text: None,
            finish_reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatClientMetadata {
    pub provider_name: String,
    pub model_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_skips_non_text_parts() {
        let m = ChatMessage {
            role: Role::User,
            contents: vec![
                MessageContent::Text {
                    text: "look at".to_string(),
                },
                MessageContent::Uri {
                    uri: "https://example.com/cat.png".to_string(),
                    media_type: Some("image/png".to_string()),
                },
                MessageContent::Text {
                    text: "this".to_string(),
                },
            ],
        };
        assert_eq!(m.text(), "look at\nthis");
    }

    #[test]
    fn message_without_text_is_empty() {
        let m = ChatMessage {
            role: Role::Assistant,
            contents: Vec::new(),
        };
        assert_eq!(m.text(), "");
    }
}
