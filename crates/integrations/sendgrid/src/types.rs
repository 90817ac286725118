use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Request body for the `mail.send` API method.
///
/// `to` and `toname` are parallel arrays. `bcc` is omitted entirely when
/// there are no blind-copy recipients. Missing bodies serialize as `false`,
/// and `headers` holds a JSON-encoded object (the API expects it
/// double-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendRequest {
    /// Recipient addresses.
    pub to: Vec<String>,

    /// Recipient display names, aligned with `to`.
    pub toname: Vec<Option<String>>,

    /// Sender address.
    pub from: String,

    /// Sender display name.
    pub fromname: Option<String>,

    /// Blind-copy addresses, without display names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<String>>,

    /// Subject line.
    pub subject: String,

    /// Plain-text body.
    #[serde(serialize_with = "string_or_false")]
    pub text: Option<String>,

    /// HTML body.
    #[serde(serialize_with = "string_or_false")]
    pub html: Option<String>,

    /// JSON-encoded header map.
    pub headers: String,
}

#[allow(clippy::ref_option)]
fn string_or_false<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(body) => serializer.serialize_str(body),
        None => serializer.serialize_bool(false),
    }
}

/// A parsed API response, kept as returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SendgridResponse(Value);

impl SendgridResponse {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    pub fn body(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Returns `true` when the response carries a non-empty `error` field.
    pub fn is_error(&self) -> bool {
        self.0.get("error").is_some_and(|error| match error {
            Value::Null | Value::Bool(false) => false,
            Value::String(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Bool(true) | Value::Number(_) => true,
        })
    }

    /// The API's error message, when the response reports a failure.
    ///
    /// Prefers `error.message`; a bare string `error` is used as-is, and any
    /// other non-empty `error` value is rendered as JSON.
    pub fn error_message(&self) -> Option<String> {
        if !self.is_error() {
            return None;
        }
        let error = &self.0["error"];
        let message = match error {
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map_or_else(|| error.to_string(), str::to_owned),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Some(message)
    }
}

impl From<Value> for SendgridResponse {
    fn from(body: Value) -> Self {
        Self(body)
    }
}
