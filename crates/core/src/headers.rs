use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::message::{Message, SMTPAPI_HEADER};

/// Header names that delivery APIs carry as first-class fields.
///
/// Matched case-sensitively against the stored header name.
pub const RESERVED_HEADERS: [&str; 5] = ["To", "From", "Bcc", "Subject", SMTPAPI_HEADER];

/// Headers regenerated by the sender for `multipart/alternative` messages.
pub const ALTERNATIVE_HEADERS: [&str; 2] = ["Content-Type", "Mime-Version"];

const MULTIPART_ALTERNATIVE: &str = "multipart/alternative";

/// Headers that survive extraction, in their original order.
///
/// Names are neither case-folded nor de-duplicated. When serialized, each
/// distinct name becomes one key (in first-seen order); a name that occurs
/// more than once maps to an array of its values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedHeaders(Vec<(String, String)>);

impl ExtractedHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Header names in order, duplicates included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    /// All values recorded under exactly `name`.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encode as a JSON object string.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for ExtractedHeaders {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
        for (name, value) in &self.0 {
            match groups.iter_mut().find(|(n, _)| *n == name.as_str()) {
                Some((_, values)) => values.push(value.as_str()),
                None => groups.push((name.as_str(), vec![value.as_str()])),
            }
        }

        let mut map = serializer.serialize_map(Some(groups.len()))?;
        for (name, values) in &groups {
            if let [single] = values.as_slice() {
                map.serialize_entry(name, single)?;
            } else {
                map.serialize_entry(name, values)?;
            }
        }
        map.end()
    }
}

/// Collect the message headers a delivery API should receive verbatim.
///
/// Drops [`RESERVED_HEADERS`], plus [`ALTERNATIVE_HEADERS`] when the
/// message's `Content-Type` starts with `multipart/alternative`.
pub fn extract_headers(message: &Message) -> ExtractedHeaders {
    let alternative = message
        .headers
        .get("Content-Type")
        .is_some_and(|value| value.starts_with(MULTIPART_ALTERNATIVE));

    let rejected = |name: &str| {
        RESERVED_HEADERS.contains(&name) || (alternative && ALTERNATIVE_HEADERS.contains(&name))
    };

    ExtractedHeaders(
        message
            .headers
            .iter()
            .filter(|(name, _)| !rejected(*name))
            .map(|(name, value)| (name.to_owned(), value.to_owned()))
            .collect(),
    )
}
