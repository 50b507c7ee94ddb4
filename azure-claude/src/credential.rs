//! Token providers for bearer authentication against Azure AI Foundry.

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::{Duration, SystemTime};

const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_on: Option<SystemTime>,
}

/// Source of short-lived bearer tokens.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

/// A token acquired out of band (for example `az account get-access-token`).
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: SecretString,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        if self.token.expose_secret().trim().is_empty() {
            return Err(LlmError::Authentication("static token is empty".to_string()));
        }
        Ok(AccessToken {
            token: self.token.clone(),
            expires_on: None,
        })
    }
}

/// Service-principal credential using the OAuth2 client-credentials grant.
///
/// Every call performs a token request; tokens are not cached.
#[derive(Debug, Clone)]
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

impl ClientSecretCredential {
    pub fn new(tenant_id: &str, client_id: &str, client_secret: SecretString) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority: DEFAULT_AUTHORITY.to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret,
        }
    }

    /// Point at a different identity authority (sovereign clouds, tests).
    pub fn with_authority(mut self, authority: &str) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id)
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    #[tracing::instrument(level = "debug", skip_all, fields(tenant = %self.tenant_id))]
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        let scope = scopes.join(" ");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| LlmError::Authentication(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Authentication(format!("token body read failed: {e}")))?;
        if !status.is_success() {
            return Err(LlmError::Authentication(format!(
                "token endpoint status={status} body={body}"
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Authentication(format!("token response invalid: {e}")))?;
        tracing::debug!(expires_in = ?parsed.expires_in, "acquired access token");

        Ok(AccessToken {
            token: SecretString::from(parsed.access_token),
            expires_on: parsed
                .expires_in
                .and_then(|secs| SystemTime::now().checked_add(Duration::from_secs(secs))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_for_any_scope() {
        let cred = StaticTokenCredential::new("tok-123");
        let token = cred.get_token(&["a", "b"]).await.expect("token");
        assert_eq!(token.token.expose_secret(), "tok-123");
        assert!(token.expires_on.is_none());
    }

    #[tokio::test]
    async fn blank_static_token_is_an_auth_error() {
        let cred = StaticTokenCredential::new("  ");
        let err = cred.get_token(&[]).await.expect_err("must fail");
        assert!(matches!(err, LlmError::Authentication(_)));
    }

    #[test]
    fn token_url_uses_trimmed_authority() {
        let secret = SecretString::from("s".to_string());
        let cred = ClientSecretCredential::new("tenant-1", "client-1", secret)
            .with_authority("http://127.0.0.1:9999/");
        assert_eq!(
            cred.token_url(),
            "http://127.0.0.1:9999/tenant-1/oauth2/v2.0/token"
        );
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let cred = ClientSecretCredential::new(
            "tenant-1",
            "client-1",
            SecretString::from("super-secret-value".to_string()),
        );
        assert!(!format!("{cred:?}").contains("super-secret-value"));
    }
}
