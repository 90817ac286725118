//! Address normalization.
//!
//! Every address token goes through two stages:
//!
//! 1. the RFC 5322 mailbox grammar (via `lettre`), accepted only when the
//!    resulting address is pure ASCII;
//! 2. otherwise an ACE repair: the display name is split off at the last
//!    `<...>` pair and the address portion is transcoded label by label
//!    (dot-separated) into punycode, then parsed again.
//!
//! The repair stage works on the whole address portion, so the label holding
//! the `@` spans the local part and the first domain label:
//! `jose@josépublic.com` becomes `xn--jose@jospublic-ikb.com`.

use std::borrow::Cow;
use std::fmt;

use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::encoding::decode_encoded_words;
use crate::error::AddressError;
use crate::message::{AddressList, AddressToken};

/// Prefix marking an ASCII-compatible-encoded label.
pub const ACE_PREFIX: &str = "xn--";

/// A normalized mailbox: a bare address plus an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// The `local@domain` part.
    pub address: String,
    /// Human-readable name, already decoded.
    pub display_name: Option<String>,
}

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Render the mailbox in its canonical header form, e.g.
    /// `Reply <reply@example.com>`. Non-ASCII display names are quoted or
    /// encoded by the mailbox grammar.
    pub fn encoded(&self) -> Result<String, AddressError> {
        let email = parse_email(&self.address, &self.address)?;
        Ok(Mailbox::new(self.display_name.clone(), email).to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "{name} <{}>", self.address),
            None => f.write_str(&self.address),
        }
    }
}

/// Normalize every token of an address field, preserving order.
///
/// Text tokens are split on commas that sit outside quoted strings and angle
/// brackets. Duplicates are kept.
pub fn parse_addresses(list: &AddressList) -> Result<Vec<Address>, AddressError> {
    let mut addresses = Vec::with_capacity(list.tokens().len());
    for token in list.tokens() {
        match token {
            AddressToken::Text(text) => {
                for part in split_tokens(text) {
                    addresses.push(parse_address(part)?);
                }
            }
            AddressToken::Mailbox(address) => addresses.push(normalize(address)?),
        }
    }
    Ok(addresses)
}

/// Normalize a single address token such as `"Tester" <to@example.com>`.
pub fn parse_address(token: &str) -> Result<Address, AddressError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(AddressError::Empty);
    }

    match token.parse::<Mailbox>() {
        Ok(mailbox) if AsRef::<str>::as_ref(&mailbox.email).is_ascii() => Ok(Address {
            address: mailbox.email.to_string(),
            display_name: mailbox.name.as_deref().and_then(decode_display_name),
        }),
        _ => {
            debug!(token, "mailbox grammar rejected address, applying ACE repair");
            repair(token)
        }
    }
}

/// Transcode every non-ASCII dot-separated label of `input` to ACE form.
///
/// ASCII labels are returned untouched; non-ASCII labels are lower-cased and
/// punycode-encoded behind the `xn--` prefix.
pub fn to_ascii(input: &str) -> String {
    input
        .split('.')
        .map(|label| {
            if label.is_ascii() {
                return Cow::Borrowed(label);
            }
            match idna::punycode::encode_str(&label.to_lowercase()) {
                Some(encoded) => Cow::Owned(format!("{ACE_PREFIX}{encoded}")),
                None => Cow::Borrowed(label),
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

fn normalize(address: &Address) -> Result<Address, AddressError> {
    let raw = address.address.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }
    Ok(Address {
        address: ascii_address(raw, raw)?,
        display_name: address.display_name.as_deref().and_then(decode_display_name),
    })
}

fn repair(token: &str) -> Result<Address, AddressError> {
    let (name, raw) = split_display_name(token);
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AddressError::Empty);
    }
    Ok(Address {
        address: ascii_address(raw, token)?,
        display_name: name.and_then(clean_display_name),
    })
}

fn ascii_address(raw: &str, input: &str) -> Result<String, AddressError> {
    let ascii = to_ascii(raw);
    if !ascii.is_ascii() {
        return Err(AddressError::NonAscii(input.to_owned()));
    }
    Ok(parse_email(&ascii, input)?.to_string())
}

fn parse_email(address: &str, input: &str) -> Result<lettre::Address, AddressError> {
    address
        .parse::<lettre::Address>()
        .map_err(|source| AddressError::Invalid {
            input: input.to_owned(),
            source,
        })
}

/// Split `Name <addr>` at the last angle-bracket pair. Text after the
/// closing bracket is ignored.
fn split_display_name(token: &str) -> (Option<&str>, &str) {
    if let Some(open) = token.rfind('<')
        && let Some(len) = token[open + 1..].find('>')
    {
        return (Some(&token[..open]), &token[open + 1..open + 1 + len]);
    }
    (None, token)
}

/// Display name as produced by the mailbox grammar or supplied by the
/// caller; quoting has already been resolved.
fn decode_display_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        None
    } else {
        Some(decode_encoded_words(name).into_owned())
    }
}

/// Raw display-name text split off during repair, still wrapped in quotes.
fn clean_display_name(raw: &str) -> Option<String> {
    decode_display_name(raw.trim().trim_matches('"'))
}

/// Split comma-separated address text, ignoring commas inside quoted strings
/// and angle brackets.
fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    let mut depth = 0u32;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '<' if !in_quotes => depth += 1,
            '>' if !in_quotes => depth = depth.saturating_sub(1),
            ',' if !in_quotes && depth == 0 => {
                tokens.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(text[start..].trim());
    tokens
}
