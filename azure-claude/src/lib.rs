//! Chat-completion adapter for Claude deployments on Azure AI Foundry.
//!
//! Translates a provider-neutral conversation into the Claude messages schema,
//! authenticates with either a bearer token or an `x-api-key` secret, and maps
//! buffered or server-sent-event responses back into neutral shapes.

mod auth;
mod cancel;
mod chat;
mod client;
mod credential;
mod error;
mod request;
mod response;
mod stream;
mod transport;
mod types;
mod wire;

pub use auth::{COGNITIVE_SERVICES_SCOPE, Credential};
pub use chat::{Capability, ChatClient, UpdateStream};
pub use client::{AzureClaudeClient, AzureClaudeClientBuilder, DEFAULT_PROVIDER_NAME};
pub use credential::{AccessToken, ClientSecretCredential, StaticTokenCredential, TokenCredential};
pub use error::{LlmError, Result};
pub use request::SystemPromptMerge;
pub use stream::StreamDecoder;
pub use types::{
    ChatClientMetadata, ChatCompletion, ChatMessage, ChatOptions, FinishReason, MessageContent,
    Role, StreamingUpdate, UsageDetails,
};

pub use tokio_util::sync::CancellationToken;
