use crate::types::{ChatCompletion, ChatMessage, FinishReason, Role, UsageDetails};
use crate::wire::WireResponse;

pub(crate) fn map_finish_reason(stop_reason: Option<&str>) -> Option<FinishReason> {
    match stop_reason? {
        "end_turn" | "stop_sequence" => Some(FinishReason::Stop),
        "max_tokens" => Some(FinishReason::Length),
        _ => None,
    }
}

impl From<WireResponse> for ChatCompletion {
    fn from(v: WireResponse) -> Self {
        let text = v
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .unwrap_or_default();
        let usage = v.usage.unwrap_or_default();

        ChatCompletion {
            completion_id: v.id,
            model_id: v.model,
            message: ChatMessage::new(Role::Assistant, text),
            finish_reason: map_finish_reason(v.stop_reason.as_deref()),
            usage: UsageDetails {
                input_tokens: usage.input_tokens,
                output_tokens: usage.output_tokens,
                total_tokens: usage.input_tokens.saturating_add(usage.output_tokens),
            },
        }
    }
}
