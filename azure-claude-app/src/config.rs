//! Connection settings for the sample runner.
//!
//! Every flag falls back to an environment variable; `.env` is loaded first by
//! `main`, and real environment variables win over it.

use azure_claude::{
    AzureClaudeClient, ClientSecretCredential, StaticTokenCredential, SystemPromptMerge,
};
use clap::{Args, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SystemMergeArg {
    Concatenate,
    LastWins,
}

impl From<SystemMergeArg> for SystemPromptMerge {
    fn from(v: SystemMergeArg) -> Self {
        match v {
            SystemMergeArg::Concatenate => SystemPromptMerge::Concatenate,
            SystemMergeArg::LastWins => SystemPromptMerge::LastWins,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ConnectionConfig {
    /// Messages endpoint of the Claude deployment.
    #[arg(long, env = "AZURE_CLAUDE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Deployment (model) name.
    #[arg(long, env = "AZURE_CLAUDE_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "AZURE_CLAUDE_APIKEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Pre-acquired bearer token, e.g. from `az account get-access-token`.
    #[arg(long, env = "AZURE_CLAUDE_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    #[arg(long, env = "AZURE_CLAUDE_ANTHROPIC_VERSION")]
    pub anthropic_version: Option<String>,

    #[arg(long, value_enum, default_value = "concatenate")]
    pub system_merge: SystemMergeArg,
}

/// Which credential form the client will be built with.
#[derive(Debug)]
pub enum CredentialSource {
    ApiKey(SecretString),
    BearerToken(SecretString),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: SecretString,
    },
}

impl CredentialSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ApiKey(_) => "api-key",
            Self::BearerToken(_) => "bearer-token",
            Self::ClientSecret { .. } => "client-secret",
        }
    }
}

fn non_blank(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ConnectionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if non_blank(&self.endpoint).is_none() {
            return Err(anyhow::anyhow!(
                "set AZURE_CLAUDE_ENDPOINT (or --endpoint) to the deployment's messages endpoint"
            ));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow::anyhow!("AZURE_CLAUDE_MODEL must not be blank"));
        }
        Ok(())
    }

    /// API key wins, then a bearer token, then a complete client-secret triple.
    pub fn credential_source(&self) -> anyhow::Result<CredentialSource> {
        if let Some(key) = non_blank(&self.api_key) {
            return Ok(CredentialSource::ApiKey(SecretString::from(key.to_string())));
        }
        if let Some(token) = non_blank(&self.bearer_token) {
            return Ok(CredentialSource::BearerToken(SecretString::from(
                token.to_string(),
            )));
        }
        match (
            non_blank(&self.tenant_id),
            non_blank(&self.client_id),
            non_blank(&self.client_secret),
        ) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                Ok(CredentialSource::ClientSecret {
                    tenant_id: tenant_id.to_string(),
                    client_id: client_id.to_string(),
                    client_secret: SecretString::from(client_secret.to_string()),
                })
            }
            (None, None, None) => Err(anyhow::anyhow!(
                "no credential configured: set AZURE_CLAUDE_APIKEY, AZURE_CLAUDE_BEARER_TOKEN, \
                 or AZURE_TENANT_ID + AZURE_CLIENT_ID + AZURE_CLIENT_SECRET"
            )),
            _ => Err(anyhow::anyhow!(
                "client-secret credential needs all of AZURE_TENANT_ID, AZURE_CLIENT_ID and \
                 AZURE_CLIENT_SECRET"
            )),
        }
    }

    pub fn build_client(&self) -> anyhow::Result<AzureClaudeClient> {
        self.validate()?;
        let endpoint = non_blank(&self.endpoint).unwrap_or_default();
        let source = self.credential_source()?;
        tracing::debug!(credential = source.label(), model = %self.model, "building client");

        let mut builder = AzureClaudeClient::builder(endpoint, &self.model)
            .system_prompt_merge(self.system_merge.into());
        builder = match source {
            CredentialSource::ApiKey(key) => builder.api_key(key),
            CredentialSource::BearerToken(token) => builder.token_credential(Arc::new(
                StaticTokenCredential::new(token.expose_secret()),
            )),
            CredentialSource::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => builder.token_credential(Arc::new(ClientSecretCredential::new(
                &tenant_id,
                &client_id,
                client_secret,
            ))),
        };
        if let Some(version) = non_blank(&self.anthropic_version) {
            builder = builder.anthropic_version(version);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ConnectionConfig {
        ConnectionConfig {
            endpoint: Some("https://example.services.ai.azure.com/anthropic/v1/messages".into()),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            bearer_token: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            anthropic_version: None,
            system_merge: SystemMergeArg::Concatenate,
        }
    }

    #[test]
    fn api_key_takes_precedence() {
        let mut cfg = base();
        cfg.api_key = Some("k".into());
        cfg.bearer_token = Some("t".into());
        let source = cfg.credential_source().expect("source");
        assert_eq!(source.label(), "api-key");
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        let mut cfg = base();
        cfg.api_key = Some("   ".into());
        cfg.bearer_token = Some("t".into());
        let source = cfg.credential_source().expect("source");
        assert_eq!(source.label(), "bearer-token");
    }

    #[test]
    fn partial_client_secret_is_rejected() {
        let mut cfg = base();
        cfg.tenant_id = Some("tenant".into());
        cfg.client_id = Some("client".into());
        let err = cfg.credential_source().expect_err("must fail");
        assert!(err.to_string().contains("needs all of"));
    }

    #[test]
    fn client_secret_triple_is_accepted() {
        let mut cfg = base();
        cfg.tenant_id = Some("tenant".into());
        cfg.client_id = Some("client".into());
        cfg.client_secret = Some("secret".into());
        let client = cfg.build_client().expect("client");
        assert_eq!(client.model(), DEFAULT_MODEL);
    }

    #[test]
    fn missing_credential_is_rejected() {
        let err = base().credential_source().expect_err("must fail");
        assert!(err.to_string().contains("no credential configured"));
    }

    #[test]
    fn missing_endpoint_is_rejected() {
        let mut cfg = base();
        cfg.endpoint = None;
        cfg.api_key = Some("k".into());
        assert!(cfg.build_client().is_err());
    }

    #[test]
    fn build_client_with_api_key() {
        let mut cfg = base();
        cfg.api_key = Some("k".into());
        cfg.anthropic_version = Some("2023-06-01".into());
        let client = cfg.build_client().expect("client");
        assert!(client.owns_transport());
    }
}
