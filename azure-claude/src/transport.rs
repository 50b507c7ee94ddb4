use crate::cancel::cancellable;
use crate::error::{LlmError, Result};
use crate::wire::{WireRequest, WireResponse};
use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Response, Url};
use std::io;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const ANTHROPIC_VERSION_HEADER: &str = "anthropic-version";

pub(crate) type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Response body of a streaming call, readable line by line.
pub(crate) type BodyReader = StreamReader<ByteStream, Bytes>;

#[derive(Debug)]
pub(crate) struct Transport {
    http: reqwest::Client,
    endpoint: Url,
    anthropic_version: Option<HeaderValue>,
    owns_transport: bool,
}

impl Transport {
    /// Transport backed by a client this adapter creates and later releases.
    pub(crate) fn owned(endpoint: Url) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            });
        Self {
            http,
            endpoint,
            anthropic_version: None,
            owns_transport: true,
        }
    }

    /// Transport reusing a caller-supplied client. The caller keeps ownership.
    pub(crate) fn external(http: reqwest::Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            anthropic_version: None,
            owns_transport: false,
        }
    }

    pub(crate) fn with_anthropic_version(mut self, version: HeaderValue) -> Self {
        self.anthropic_version = Some(version);
        self
    }

    pub(crate) fn owns_transport(&self) -> bool {
        self.owns_transport
    }

    pub(crate) fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub(crate) fn into_http(self) -> reqwest::Client {
        self.http
    }

    async fn post(
        &self,
        req: &WireRequest,
        auth: (HeaderName, HeaderValue),
    ) -> Result<Response> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(auth.0, auth.1)
            .json(req);
        if let Some(version) = &self.anthropic_version {
            builder = builder.header(ANTHROPIC_VERSION_HEADER, version.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Transport { status, body });
        }
        Ok(response)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(endpoint = %self.endpoint))]
    pub(crate) async fn send_buffered(
        &self,
        req: &WireRequest,
        auth: (HeaderName, HeaderValue),
        cancel: &CancellationToken,
    ) -> Result<WireResponse> {
        cancellable(cancel, async {
            let response = self.post(req, auth).await?;
            let body = response.bytes().await?;
            let parsed: WireResponse = serde_json::from_slice(&body)?;
            Ok(parsed)
        })
        .await
    }

    /// Returns as soon as response headers arrive; the body is left unread.
    #[tracing::instrument(level = "debug", skip_all, fields(endpoint = %self.endpoint))]
    pub(crate) async fn send_streaming(
        &self,
        req: &WireRequest,
        auth: (HeaderName, HeaderValue),
        cancel: &CancellationToken,
    ) -> Result<BodyReader> {
        let response = cancellable(cancel, self.post(req, auth)).await?;
        let bytes: ByteStream = Box::pin(response.bytes_stream().map_err(io::Error::other));
        Ok(StreamReader::new(bytes))
    }
}
