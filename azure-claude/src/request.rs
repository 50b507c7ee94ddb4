use crate::types::{ChatMessage, ChatOptions, Role};
use crate::wire::{WireMessage, WireRequest};

pub(crate) const DEFAULT_MAX_TOKENS: u32 = 1024;

/// How several system turns in one conversation collapse into the single
/// `system` field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SystemPromptMerge {
    /// Newline-join every system turn, in order.
    #[default]
    Concatenate,
    /// Keep only the last system turn.
    LastWins,
}

pub(crate) fn build_request(
    model: &str,
    messages: &[ChatMessage],
    options: Option<&ChatOptions>,
    stream: bool,
    merge: SystemPromptMerge,
) -> WireRequest {
    let mut system: Option<String> = None;
    let mut out_messages = Vec::with_capacity(messages.len());

    for m in messages {
        match m.role {
            Role::System => {
                let text = m.text();
                system = match (system, merge) {
                    (Some(mut acc), SystemPromptMerge::Concatenate) => {
                        acc.push('\n');
                        acc.push_str(&text);
                        Some(acc)
                    }
                    _ => Some(text),
                };
            }
            role => out_messages.push(WireMessage {
                role: if role == Role::User { "user" } else { "assistant" },
                content: m.text(),
            }),
        }
    }

    WireRequest {
        model: model.to_string(),
        messages: out_messages,
        system,
        max_tokens: options
            .and_then(|o| o.max_output_tokens)
            .unwrap_or(DEFAULT_MAX_TOKENS),
        temperature: options.and_then(|o| o.temperature),
        top_p: options.and_then(|o| o.top_p),
        stream,
    }
}
