use crate::auth::{Authenticator, Credential};
use crate::chat::{Capability, ChatClient, UpdateStream};
use crate::credential::TokenCredential;
use crate::error::{LlmError, Result};
use crate::request::{SystemPromptMerge, build_request};
use crate::stream::StreamDecoder;
use crate::transport::Transport;
use crate::types::{ChatClientMetadata, ChatCompletion, ChatMessage, ChatOptions};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::HeaderValue;
use secrecy::SecretString;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PROVIDER_NAME: &str = "Azure AI Foundry";

/// Chat client for a Claude deployment on Azure AI Foundry.
///
/// Configuration is read-only after construction, so one instance can serve
/// concurrent calls. Each call builds its own request and owns its response.
#[derive(Debug)]
pub struct AzureClaudeClient {
    model: String,
    provider_name: String,
    system_merge: SystemPromptMerge,
    auth: Authenticator,
    transport: Transport,
}

impl AzureClaudeClient {
    pub fn builder(endpoint: &str, model: &str) -> AzureClaudeClientBuilder {
        AzureClaudeClientBuilder::new(endpoint, model)
    }

    /// Static-secret mode: every request carries `x-api-key`.
    pub fn with_api_key(endpoint: &str, model: &str, api_key: SecretString) -> Result<Self> {
        Self::builder(endpoint, model).api_key(api_key).build()
    }

    /// Token mode: every request carries a freshly fetched bearer token.
    pub fn with_token_credential(
        endpoint: &str,
        model: &str,
        credential: Arc<dyn TokenCredential>,
    ) -> Result<Self> {
        Self::builder(endpoint, model)
            .token_credential(credential)
            .build()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &Url {
        self.transport.endpoint()
    }

    pub fn owns_transport(&self) -> bool {
        self.transport.owns_transport()
    }

    /// Release the client. A transport this client created is dropped; a
    /// caller-supplied one is handed back untouched.
    pub fn close(self) -> Option<reqwest::Client> {
        if self.transport.owns_transport() {
            tracing::debug!("releasing owned http transport");
            drop(self.transport);
            None
        } else {
            tracing::debug!("leaving caller-supplied http transport open");
            Some(self.transport.into_http())
        }
    }
}

#[async_trait]
impl ChatClient for AzureClaudeClient {
    fn metadata(&self) -> ChatClientMetadata {
        ChatClientMetadata {
            provider_name: self.provider_name.clone(),
            model_id: self.model.clone(),
        }
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: Option<&ChatOptions>,
        cancel: &CancellationToken,
    ) -> Result<ChatCompletion> {
        let req = build_request(&self.model, messages, options, false, self.system_merge);
        tracing::debug!(
            messages = req.messages.len(),
            has_system = req.system.is_some(),
            max_tokens = req.max_tokens,
            auth = self.auth.mode(),
            "sending completion request"
        );

        let auth = self.auth.authorize(cancel).await?;
        let response = self.transport.send_buffered(&req, auth, cancel).await?;
        let completion = ChatCompletion::from(response);

        tracing::debug!(
            finish_reason = ?completion.finish_reason,
            input_tokens = completion.usage.input_tokens,
            output_tokens = completion.usage.output_tokens,
            "completion received"
        );
        Ok(completion)
    }

    #[tracing::instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        options: Option<&ChatOptions>,
        cancel: &CancellationToken,
    ) -> Result<UpdateStream> {
        let req = build_request(&self.model, messages, options, true, self.system_merge);
        tracing::debug!(
            messages = req.messages.len(),
            has_system = req.system.is_some(),
            max_tokens = req.max_tokens,
            auth = self.auth.mode(),
            "opening completion stream"
        );

        let auth = self.auth.authorize(cancel).await?;
        let body = self.transport.send_streaming(&req, auth, cancel).await?;
        let updates = StreamDecoder::new(body).into_updates(cancel.clone());
        Ok(Box::pin(updates))
    }

    fn get_service(&self, capability: Capability) -> Option<&dyn ChatClient> {
        match capability {
            Capability::ChatClient => Some(self),
            Capability::EmbeddingGenerator | Capability::ImageGenerator => None,
        }
    }
}

#[derive(Debug)]
pub struct AzureClaudeClientBuilder {
    endpoint: String,
    model: String,
    credential: Option<Credential>,
    http: Option<reqwest::Client>,
    provider_name: Option<String>,
    system_merge: SystemPromptMerge,
    anthropic_version: Option<String>,
}

impl AzureClaudeClientBuilder {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            credential: None,
            http: None,
            provider_name: None,
            system_merge: SystemPromptMerge::default(),
            anthropic_version: None,
        }
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn api_key(self, api_key: SecretString) -> Self {
        self.credential(Credential::ApiKey(api_key))
    }

    pub fn token_credential(self, credential: Arc<dyn TokenCredential>) -> Self {
        self.credential(Credential::Token(credential))
    }

    /// Reuse an existing client (and its connection pool). The client is not
    /// closed when the adapter is.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn provider_name(mut self, name: &str) -> Self {
        self.provider_name = Some(name.to_string());
        self
    }

    pub fn system_prompt_merge(mut self, merge: SystemPromptMerge) -> Self {
        self.system_merge = merge;
        self
    }

    /// Send `anthropic-version` with every request.
    pub fn anthropic_version(mut self, version: &str) -> Self {
        self.anthropic_version = Some(version.to_string());
        self
    }

    pub fn build(self) -> Result<AzureClaudeClient> {
        let endpoint = parse_endpoint(&self.endpoint)?;

        let model = self.model.trim();
        if model.is_empty() {
            return Err(LlmError::Configuration("model must not be empty".to_string()));
        }

        let Some(credential) = self.credential else {
            return Err(LlmError::Configuration(
                "a token credential or api key is required".to_string(),
            ));
        };
        let auth = Authenticator::new(credential)?;

        let mut transport = match self.http {
            Some(http) => Transport::external(http, endpoint),
            None => Transport::owned(endpoint),
        };
        if let Some(version) = self.anthropic_version {
            let value = HeaderValue::from_str(version.trim()).map_err(|_| {
                LlmError::Configuration(format!("invalid anthropic-version: {version:?}"))
            })?;
            transport = transport.with_anthropic_version(value);
        }

        tracing::debug!(
            endpoint = %transport.endpoint(),
            model,
            auth = auth.mode(),
            owns_transport = transport.owns_transport(),
            "azure claude client ready"
        );

        Ok(AzureClaudeClient {
            model: model.to_string(),
            provider_name: self
                .provider_name
                .unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            system_merge: self.system_merge,
            auth,
            transport,
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(LlmError::Configuration("endpoint must not be empty".to_string()));
    }
    let url = Url::parse(raw)
        .map_err(|e| LlmError::Configuration(format!("invalid endpoint {raw:?}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LlmError::Configuration(format!(
            "endpoint scheme must be http or https, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::StaticTokenCredential;

    const ENDPOINT: &str = "https://example.services.ai.azure.com/anthropic/v1/messages";
    const MODEL: &str = "claude-sonnet-4-5";

    fn key(v: &str) -> SecretString {
        SecretString::from(v.to_string())
    }

    fn api_key_client() -> AzureClaudeClient {
        AzureClaudeClient::with_api_key(ENDPOINT, MODEL, key("k")).expect("client")
    }

    #[test]
    fn metadata_reports_provider_and_model() {
        let client = api_key_client();
        let meta = client.metadata();
        assert_eq!(meta.provider_name, "Azure AI Foundry");
        assert_eq!(meta.model_id, MODEL);
    }

    #[test]
    fn provider_name_is_configurable() {
        let client = AzureClaudeClient::builder(ENDPOINT, MODEL)
            .api_key(key("k"))
            .provider_name("azure-claude")
            .build()
            .expect("client");
        assert_eq!(client.metadata().provider_name, "azure-claude");
    }

    #[test]
    fn token_mode_builds_without_network() {
        let cred = Arc::new(StaticTokenCredential::new("tok"));
        let client =
            AzureClaudeClient::with_token_credential(ENDPOINT, MODEL, cred).expect("client");
        assert_eq!(client.model(), MODEL);
        assert_eq!(client.endpoint().as_str(), ENDPOINT);
    }

    #[test]
    fn blank_api_key_is_a_configuration_error() {
        for v in ["", " "] {
            let err = AzureClaudeClient::with_api_key(ENDPOINT, MODEL, key(v))
                .expect_err("blank key must fail");
            assert!(matches!(err, LlmError::Configuration(_)));
        }
    }

    #[test]
    fn missing_pieces_are_configuration_errors() {
        let no_credential = AzureClaudeClient::builder(ENDPOINT, MODEL).build();
        assert!(matches!(no_credential, Err(LlmError::Configuration(_))));

        let blank_model = AzureClaudeClient::with_api_key(ENDPOINT, "  ", key("k"));
        assert!(matches!(blank_model, Err(LlmError::Configuration(_))));

        let blank_endpoint = AzureClaudeClient::with_api_key("", MODEL, key("k"));
        assert!(matches!(blank_endpoint, Err(LlmError::Configuration(_))));

        let bad_endpoint = AzureClaudeClient::with_api_key("not a url", MODEL, key("k"));
        assert!(matches!(bad_endpoint, Err(LlmError::Configuration(_))));

        let bad_scheme = AzureClaudeClient::with_api_key("ftp://example.com", MODEL, key("k"));
        assert!(matches!(bad_scheme, Err(LlmError::Configuration(_))));

        let bad_version = AzureClaudeClient::builder(ENDPOINT, MODEL)
            .api_key(key("k"))
            .anthropic_version("2023\n06")
            .build();
        assert!(matches!(bad_version, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn get_service_returns_self_for_chat_client() {
        let client = api_key_client();
        let service = client
            .get_service(Capability::ChatClient)
            .expect("chat client capability");
        assert!(std::ptr::addr_eq(
            service as *const dyn ChatClient,
            &client as *const AzureClaudeClient
        ));
    }

    #[test]
    fn get_service_returns_none_for_unrelated_capability() {
        let client = api_key_client();
        assert!(client.get_service(Capability::EmbeddingGenerator).is_none());
        assert!(client.get_service(Capability::ImageGenerator).is_none());
    }

    #[test]
    fn close_drops_owned_transport() {
        let client = api_key_client();
        assert!(client.owns_transport());
        assert!(client.close().is_none());
    }

    #[test]
    fn close_hands_back_external_transport() {
        let http = reqwest::Client::new();
        let client = AzureClaudeClient::builder(ENDPOINT, MODEL)
            .api_key(key("k"))
            .http_client(http)
            .build()
            .expect("client");
        assert!(!client.owns_transport());
        assert!(client.close().is_some());
    }

    #[test]
    fn debug_output_never_contains_secret() {
        let client = AzureClaudeClient::with_api_key(ENDPOINT, MODEL, key("very-secret-key"))
            .expect("client");
        assert!(!format!("{client:?}").contains("very-secret-key"));
    }
}
