use thiserror::Error;

/// Errors raised while normalizing email addresses.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The token was empty or contained only whitespace.
    #[error("empty address")]
    Empty,

    /// A label could not be transcoded to ASCII.
    #[error("address {0:?} could not be converted to ASCII")]
    NonAscii(String),

    /// The token could not be parsed, even after ACE repair.
    #[error("invalid address {input:?}: {source}")]
    Invalid {
        /// The token as supplied by the caller.
        input: String,
        /// The underlying mailbox grammar error.
        #[source]
        source: lettre::address::AddressError,
    },
}
