use crate::error::Result;
use crate::types::{ChatClientMetadata, ChatCompletion, ChatMessage, ChatOptions, StreamingUpdate};
use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

pub type UpdateStream = Pin<Box<dyn Stream<Item = Result<StreamingUpdate>> + Send>>;

/// Services a client can be asked for through [`ChatClient::get_service`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ChatClient,
    EmbeddingGenerator,
    ImageGenerator,
}

/// Provider-neutral chat completion contract.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn metadata(&self) -> ChatClientMetadata;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: Option<&ChatOptions>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion>;

    /// Failures that happen before the first byte of the body (auth, status)
    /// are returned here; later failures arrive as stream items.
    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        options: Option<&ChatOptions>,
        cancel: &CancellationToken,
    ) -> Result<UpdateStream>;

    /// `Some(self)` when this client provides `capability`.
    fn get_service(&self, capability: Capability) -> Option<&dyn ChatClient>;
}
