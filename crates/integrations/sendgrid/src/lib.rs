//! SendGrid delivery adapter for mailgate.
//!
//! Translates a [`mailgate_core::Message`] into a request for the
//! [SendGrid Web API v2](https://sendgrid.com/docs/API_Reference/Web_API/mail.html)
//! `mail.send` method, posts it, and maps the API's answer onto a
//! [`SendgridError`] or the raw [`SendgridResponse`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mailgate_core::Message;
//! use mailgate_sendgrid::{SendgridConfig, SendgridMailer};
//!
//! # async fn run() -> Result<(), mailgate_sendgrid::SendgridError> {
//! let mailer = SendgridMailer::new(SendgridConfig::new("api_user", "api_key"))?;
//! let mut message = Message::new()
//!     .with_from("Sender <from@example.com>")
//!     .with_to("to@example.com")
//!     .with_subject("Hello")
//!     .with_text_body("Hi there");
//! let response = mailer.deliver(&mut message).await?;
//! # let _ = response;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mailer;
pub mod payload;
pub mod result;
pub mod transport;
pub mod types;

pub use config::{ConfigOptions, SendgridConfig, global};
pub use error::{ConfigError, SendgridError, TransportError};
pub use mailer::SendgridMailer;
pub use payload::{PreparedDelivery, check_delivery_params, prepare};
pub use result::map_result;
pub use transport::{HttpTransport, RequestMiddleware, StaticHeaders, Transport};
pub use types::{SendRequest, SendgridResponse};
