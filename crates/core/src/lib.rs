//! Message model and the delivery-independent parts of mailgate.
//!
//! - [`message`]: the [`Message`] handed to delivery adapters.
//! - [`address`]: address-list parsing with IDN (ACE) repair.
//! - [`headers`]: extraction of the headers an HTTP mail API should receive.

pub mod address;
pub mod encoding;
pub mod error;
pub mod headers;
pub mod message;

pub use address::{ACE_PREFIX, Address, parse_address, parse_addresses, to_ascii};
pub use encoding::decode_encoded_words;
pub use error::AddressError;
pub use headers::{ExtractedHeaders, extract_headers};
pub use message::{AddressList, AddressToken, Headers, Message, SMTPAPI_HEADER};
