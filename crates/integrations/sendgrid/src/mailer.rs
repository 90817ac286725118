use std::sync::Arc;

use mailgate_core::Message;
use tracing::{debug, info, instrument};

use crate::config::{SendgridConfig, global};
use crate::error::SendgridError;
use crate::payload::{SEND_PATH, prepare};
use crate::result::map_result;
use crate::transport::{HttpTransport, Transport};
use crate::types::SendgridResponse;

/// Delivers [`Message`]s through the SendGrid Web API.
///
/// The mailer owns no mutable state, so one instance can be shared across
/// tasks and each `deliver` call is independent.
#[derive(Clone)]
pub struct SendgridMailer {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for SendgridMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendgridMailer")
            .field("transport", &self.transport)
            .finish()
    }
}

impl SendgridMailer {
    /// Create a mailer backed by [`HttpTransport`].
    pub fn new(config: SendgridConfig) -> Result<Self, SendgridError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(config)?)))
    }

    /// Create a mailer from a snapshot of the process-wide configuration.
    pub fn from_global() -> Result<Self, SendgridError> {
        Self::new(global::get())
    }

    /// Create a mailer over a custom transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Validate, translate and send `message`.
    ///
    /// Validation failures are returned before any request is made. On
    /// success the parsed API response is returned as-is; a response carrying
    /// an `error` becomes [`SendgridError::Delivery`].
    #[instrument(skip(self, message), fields(provider = "sendgrid"))]
    pub async fn deliver(&self, message: &mut Message) -> Result<SendgridResponse, SendgridError> {
        let prepared = prepare(message)?;

        debug!(
            from = %prepared.request.from,
            recipients = prepared.request.to.len(),
            "delivering message"
        );

        let response = self
            .transport
            .post(SEND_PATH, prepared.smtpapi.as_deref(), &prepared.request)
            .await?;
        let response = map_result(response)?;

        info!(recipients = prepared.request.to.len(), "message accepted by SendGrid");
        Ok(response)
    }
}
