use crate::cancel::cancellable;
use crate::credential::TokenCredential;
use crate::error::{LlmError, Result};
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Audience requested for every bearer token.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

const API_KEY_HEADER: &str = "x-api-key";

/// The one credential form a client is built with.
#[derive(Clone)]
pub enum Credential {
    Token(Arc<dyn TokenCredential>),
    ApiKey(SecretString),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Credential::Token(..)"),
            Self::ApiKey(_) => f.write_str("Credential::ApiKey([REDACTED])"),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Authenticator {
    credential: Credential,
}

impl Authenticator {
    pub(crate) fn new(credential: Credential) -> Result<Self> {
        if let Credential::ApiKey(key) = &credential {
            let key = key.expose_secret();
            if key.trim().is_empty() {
                return Err(LlmError::Configuration("api key must not be empty".to_string()));
            }
            if HeaderValue::from_str(key).is_err() {
                return Err(LlmError::Configuration(
                    "api key contains characters not allowed in an http header".to_string(),
                ));
            }
        }
        Ok(Self { credential })
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self.credential {
            Credential::Token(_) => "bearer",
            Credential::ApiKey(_) => "api-key",
        }
    }

    /// Resolve the header to attach to one outbound request.
    pub(crate) async fn authorize(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(HeaderName, HeaderValue)> {
        match &self.credential {
            Credential::ApiKey(key) => {
                let mut value = HeaderValue::from_str(key.expose_secret())
                    .map_err(|e| LlmError::Configuration(e.to_string()))?;
                value.set_sensitive(true);
                Ok((HeaderName::from_static(API_KEY_HEADER), value))
            }
            Credential::Token(provider) => {
                let token = cancellable(cancel, async {
                    provider
                        .get_token(&[COGNITIVE_SERVICES_SCOPE])
                        .await
                        .map_err(|e| match e {
                            LlmError::Cancelled | LlmError::Authentication(_) => e,
                            other => LlmError::Authentication(other.to_string()),
                        })
                })
                .await?;
                let mut value =
                    HeaderValue::from_str(&format!("Bearer {}", token.token.expose_secret()))
                        .map_err(|_| {
                            LlmError::Authentication(
                                "token contains characters not allowed in an http header"
                                    .to_string(),
                            )
                        })?;
                value.set_sensitive(true);
                Ok((AUTHORIZATION, value))
            }
        }
    }
}
