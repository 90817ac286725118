use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::SendgridConfig;
use crate::error::{SendgridError, TransportError};
use crate::types::{SendRequest, SendgridResponse};

/// Sends an assembled request to the API.
///
/// Implementations own authentication, connection handling and response
/// parsing; [`SendgridMailer`](crate::SendgridMailer) only builds the
/// payload and interprets the parsed response.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// POST `payload` to the `mail.{path}` method.
    ///
    /// `smtpapi` is the pre-serialized `X-SMTPAPI` routing blob, passed
    /// through untouched. Non-success HTTP statuses are errors.
    async fn post(
        &self,
        path: &str,
        smtpapi: Option<&str>,
        payload: &SendRequest,
    ) -> Result<SendgridResponse, TransportError>;
}

/// A hook applied to every outbound request, in configuration order.
pub trait RequestMiddleware: Send + Sync + std::fmt::Debug {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder;
}

/// Middleware adding fixed headers to each request.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: Vec<(String, String)>,
}

impl StaticHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl RequestMiddleware for StaticHeaders {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        self.headers
            .iter()
            .fold(request, |request, (name, value)| {
                request.header(name.as_str(), value.as_str())
            })
    }
}

/// JSON body of a `mail.*` call: credentials, routing blob and payload.
#[derive(Serialize)]
struct Envelope<'a> {
    api_user: &'a str,
    api_key: &'a str,
    #[serde(rename = "x-smtpapi", skip_serializing_if = "Option::is_none")]
    smtpapi: Option<&'a str>,
    #[serde(flatten)]
    payload: &'a SendRequest,
}

/// [`Transport`] over the SendGrid Web API using `reqwest`.
pub struct HttpTransport {
    config: SendgridConfig,
    client: Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport with a default `reqwest::Client` and a 30-second
    /// request timeout.
    pub fn new(config: SendgridConfig) -> Result<Self, SendgridError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(TransportError::from)?;
        Self::with_client(config, client)
    }

    /// Create a transport with a custom HTTP client.
    ///
    /// Useful for sharing a connection pool across clients.
    pub fn with_client(config: SendgridConfig, client: Client) -> Result<Self, SendgridError> {
        config.validate()?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &SendgridConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, smtpapi, payload), fields(provider = "sendgrid"))]
    async fn post(
        &self,
        path: &str,
        smtpapi: Option<&str>,
        payload: &SendRequest,
    ) -> Result<SendgridResponse, TransportError> {
        let (api_user, api_key) = self
            .config
            .credentials()
            .ok_or(TransportError::MissingCredentials)?;

        let url = self.config.mail_url(path);
        let envelope = Envelope {
            api_user,
            api_key,
            smtpapi,
            payload,
        };

        debug!(%url, recipients = payload.to.len(), "posting to SendGrid");

        let request = self
            .config
            .middleware
            .iter()
            .fold(self.client.post(&url).json(&envelope), |request, hook| {
                hook.apply(request)
            });
        let response = request.send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("SendGrid API rate limit hit");
            return Err(TransportError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json().await?)
    }
}
