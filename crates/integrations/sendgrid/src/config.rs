use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::ConfigError;
use crate::transport::RequestMiddleware;

/// Base URL of the SendGrid Web API.
pub const DEFAULT_ENDPOINT: &str = "https://api.sendgrid.com/api/";

/// Response format requested from the API.
pub const DEFAULT_FORMAT: &str = "json";

/// Configuration for the SendGrid client.
///
/// Build one with [`SendgridConfig::new`] and the `with_*` methods, or apply
/// loosely typed batches (e.g. from a TOML file) with
/// [`configure`](Self::configure), which validates before committing.
#[derive(Clone)]
pub struct SendgridConfig {
    /// SendGrid API user.
    pub api_user: Option<String>,

    /// SendGrid API key.
    pub api_key: Option<String>,

    /// Base URL for the Web API. Override this for testing against a mock
    /// server.
    pub endpoint: String,

    /// Response format suffix used in request URLs.
    pub format: String,

    /// Hooks applied, in order, to every outbound request.
    pub middleware: Vec<Arc<dyn RequestMiddleware>>,
}

impl std::fmt::Debug for SendgridConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendgridConfig")
            .field("api_user", &self.api_user)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl Default for SendgridConfig {
    fn default() -> Self {
        Self {
            api_user: None,
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            format: DEFAULT_FORMAT.to_owned(),
            middleware: Vec::new(),
        }
    }
}

impl SendgridConfig {
    /// Create a configuration with the given credentials and default
    /// endpoint.
    pub fn new(api_user: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_user: Some(api_user.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Parse a TOML document and apply it on top of the defaults.
    ///
    /// ```
    /// use mailgate_sendgrid::SendgridConfig;
    ///
    /// let config = SendgridConfig::from_toml_str(
    ///     r#"
    ///     api_user = "user"
    ///     api_key = "secret"
    ///     "#,
    /// )
    /// .unwrap();
    /// assert!(config.has_credentials());
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: ConfigOptions = toml::from_str(source)?;
        let mut config = Self::default();
        config.configure(options)?;
        Ok(config)
    }

    /// Override the API base URL (useful for testing).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Append a request hook.
    #[must_use]
    pub fn with_middleware(mut self, middleware: impl RequestMiddleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Apply a batch of option updates, then validate.
    ///
    /// The batch is applied all-or-nothing: when validation fails the
    /// configuration is left untouched.
    pub fn configure(&mut self, options: ConfigOptions) -> Result<&mut Self, ConfigError> {
        let mut next = self.clone();
        if let Some(value) = options.api_user {
            next.api_user = credential("api_user", value)?;
        }
        if let Some(value) = options.api_key {
            next.api_key = credential("api_key", value)?;
        }
        if let Some(endpoint) = options.endpoint {
            next.endpoint = endpoint;
        }
        if let Some(format) = options.format {
            next.format = format;
        }
        if let Some(middleware) = options.middleware {
            next.middleware = middleware;
        }
        next.validate()?;
        *self = next;
        Ok(self)
    }

    /// Restore every option to its default.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    /// Check the endpoint and format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        reqwest::Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidEndpoint(self.endpoint.clone()))?;
        if !self.format.eq_ignore_ascii_case(DEFAULT_FORMAT) {
            return Err(ConfigError::UnsupportedFormat(self.format.clone()));
        }
        Ok(())
    }

    /// Both credentials, when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let api_user = self.api_user.as_deref().filter(|v| !v.is_empty())?;
        let api_key = self.api_key.as_deref().filter(|v| !v.is_empty())?;
        Some((api_user, api_key))
    }

    /// Returns `true` when both credentials are present and non-empty.
    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    /// URL of a `mail.*` API method, e.g. `.../api/mail.send.json`.
    pub fn mail_url(&self, method: &str) -> String {
        let separator = if self.endpoint.ends_with('/') { "" } else { "/" };
        format!(
            "{}{separator}mail.{method}.{}",
            self.endpoint,
            self.format.to_ascii_lowercase()
        )
    }
}

/// A batch of option updates for [`SendgridConfig::configure`].
///
/// Absent fields leave the current value unchanged. Credentials are kept
/// loosely typed until the batch is applied; a `Value::Null` credential
/// clears it.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOptions {
    #[serde(default)]
    pub api_user: Option<Value>,
    #[serde(default)]
    pub api_key: Option<Value>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(skip)]
    pub middleware: Option<Vec<Arc<dyn RequestMiddleware>>>,
}

impl std::fmt::Debug for ConfigOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigOptions")
            .field("api_user", &self.api_user)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("endpoint", &self.endpoint)
            .field("format", &self.format)
            .field("middleware", &self.middleware)
            .finish()
    }
}

impl ConfigOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_api_user(mut self, value: impl Into<Value>) -> Self {
        self.api_user = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, value: impl Into<Value>) -> Self {
        self.api_key = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Replace the middleware list.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Vec<Arc<dyn RequestMiddleware>>) -> Self {
        self.middleware = Some(middleware);
        self
    }
}

fn credential(name: &'static str, value: Value) -> Result<Option<String>, ConfigError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(ConfigError::InvalidCredential { name, value: other }),
    }
}

/// Process-wide default configuration.
///
/// Nothing in this crate reads it implicitly; callers opt in through
/// [`SendgridMailer::from_global`](crate::SendgridMailer::from_global).
/// Intended to be configured once at startup.
pub mod global {
    use std::sync::{LazyLock, PoisonError, RwLock};

    use super::{ConfigOptions, SendgridConfig};
    use crate::error::ConfigError;

    static DEFAULT: LazyLock<RwLock<SendgridConfig>> =
        LazyLock::new(|| RwLock::new(SendgridConfig::default()));

    /// Apply a batch to the process-wide configuration and return the result.
    pub fn configure(options: ConfigOptions) -> Result<SendgridConfig, ConfigError> {
        let mut config = DEFAULT.write().unwrap_or_else(PoisonError::into_inner);
        config.configure(options)?;
        Ok(config.clone())
    }

    /// A snapshot of the process-wide configuration.
    pub fn get() -> SendgridConfig {
        DEFAULT
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Restore the defaults. Calling it repeatedly has no further effect.
    pub fn reset() {
        DEFAULT
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }
}
