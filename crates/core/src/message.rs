use crate::address::Address;

/// Name of the provider routing header carried on the message.
pub const SMTPAPI_HEADER: &str = "X-SMTPAPI";

/// A single entry in an address field.
///
/// Text tokens may hold several comma-separated mailboxes; they are split
/// during normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressToken {
    /// Raw address text, e.g. `"Tester" <to@example.com>, other@example.com`.
    Text(String),
    /// An already-structured address.
    Mailbox(Address),
}

impl AddressToken {
    fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Mailbox(address) => address.address.trim().is_empty(),
        }
    }
}

impl From<&str> for AddressToken {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for AddressToken {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Address> for AddressToken {
    fn from(address: Address) -> Self {
        Self::Mailbox(address)
    }
}

/// An ordered address field (`From`, `To`, `Bcc`, `Reply-To`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList(Vec<AddressToken>);

impl AddressList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a token to the end of the list.
    pub fn push(&mut self, token: impl Into<AddressToken>) {
        self.0.push(token.into());
    }

    pub fn tokens(&self) -> &[AddressToken] {
        &self.0
    }

    /// Returns `true` when the list carries no usable address text.
    pub fn is_blank(&self) -> bool {
        self.0.iter().all(AddressToken::is_blank)
    }
}

impl From<AddressToken> for AddressList {
    fn from(token: AddressToken) -> Self {
        Self(vec![token])
    }
}

impl From<&str> for AddressList {
    fn from(text: &str) -> Self {
        AddressToken::from(text).into()
    }
}

impl From<String> for AddressList {
    fn from(text: String) -> Self {
        AddressToken::from(text).into()
    }
}

impl From<Address> for AddressList {
    fn from(address: Address) -> Self {
        AddressToken::from(address).into()
    }
}

impl<T: Into<AddressToken>> From<Vec<T>> for AddressList {
    fn from(tokens: Vec<T>) -> Self {
        tokens.into_iter().collect()
    }
}

impl<T: Into<AddressToken>, const N: usize> From<[T; N]> for AddressList {
    fn from(tokens: [T; N]) -> Self {
        tokens.into_iter().collect()
    }
}

impl<T: Into<AddressToken>> FromIterator<T> for AddressList {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Ordered header fields. Names keep their original case and may repeat.
///
/// Lookups ([`get`](Self::get), [`contains`](Self::contains),
/// [`set`](Self::set)) compare names case-insensitively, as mail headers do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, keeping any existing fields with the same name.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the first field named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every field named `name` with a single field holding `value`.
    ///
    /// The replacement takes the position of the first existing field, or is
    /// appended when there was none.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter().position(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(index) => {
                self.0[index].1 = value;
                let mut seen = 0usize;
                self.0.retain(|(n, _)| {
                    if n.eq_ignore_ascii_case(&name) {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => self.0.push((name, value)),
        }
    }

    /// Remove every field named `name`, returning how many were removed.
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        before - self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An email message as handed to a delivery adapter.
///
/// Adapters read every field and only ever write the `Return-Path` and
/// `Reply-To` headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Sender(s). Only the first address is used for delivery.
    pub from: Option<AddressList>,
    /// Primary recipients.
    pub to: Option<AddressList>,
    /// Blind-copy recipients.
    pub bcc: Option<AddressList>,
    /// Reply-to address(es).
    pub reply_to: Option<AddressList>,
    /// Subject line.
    pub subject: Option<String>,
    /// Plain-text body.
    pub text_body: Option<String>,
    /// HTML body.
    pub html_body: Option<String>,
    /// Remaining header fields, in order.
    pub headers: Headers,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<AddressList>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_to(mut self, to: impl Into<AddressList>) -> Self {
        self.to = Some(to.into());
        self
    }

    #[must_use]
    pub fn with_bcc(mut self, bcc: impl Into<AddressList>) -> Self {
        self.bcc = Some(bcc.into());
        self
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<AddressList>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.text_body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_html_body(mut self, body: impl Into<String>) -> Self {
        self.html_body = Some(body.into());
        self
    }

    /// Append a header field.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// The pre-serialized routing blob from the `X-SMTPAPI` header, if any.
    pub fn smtpapi(&self) -> Option<&str> {
        self.headers.get(SMTPAPI_HEADER)
    }

    /// Plain-text body, when present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.text_body.as_deref().filter(|body| !body.is_empty())
    }

    /// HTML body, when present and non-empty.
    pub fn html(&self) -> Option<&str> {
        self.html_body.as_deref().filter(|body| !body.is_empty())
    }
}
