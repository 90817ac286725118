//! RFC 2047 encoded-word decoding for display names.
//!
//! Display names arrive either as plain text or as encoded words such as
//! `=?UTF-8?B?Sm9zw6kgUHVibGljbw==?=`. Only the charsets that show up in
//! practice for names are understood (UTF-8, US-ASCII, ISO-8859-1); words in
//! any other charset, or with a malformed payload, are kept verbatim.

use std::borrow::Cow;
use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use regex::Regex;

/// Captures charset, encoding (`B`/`Q`) and encoded text.
static ENCODED_WORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"=\?([^?\s]+)\?([BbQq])\?([^?\s]*)\?=").expect("encoded-word regex is valid")
});

/// Decode every encoded word in `input`.
///
/// Whitespace separating two adjacent encoded words is dropped, as RFC 2047
/// requires. Returns the input unchanged (borrowed) when it has no encoded
/// words.
pub fn decode_encoded_words(input: &str) -> Cow<'_, str> {
    if !input.contains("=?") {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut last_end = 0;
    let mut previous_was_word = false;

    for caps in ENCODED_WORD_RE.captures_iter(input) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let gap = &input[last_end..whole.start()];
        if !(previous_was_word && gap.trim().is_empty()) {
            out.push_str(gap);
        }

        match decode_word(&caps[1], &caps[2], &caps[3]) {
            Some(decoded) => out.push_str(&decoded),
            None => out.push_str(whole.as_str()),
        }

        last_end = whole.end();
        previous_was_word = true;
    }

    out.push_str(&input[last_end..]);
    Cow::Owned(out)
}

fn decode_word(charset: &str, encoding: &str, text: &str) -> Option<String> {
    let bytes = if encoding.eq_ignore_ascii_case("b") {
        B64.decode(text).ok()?
    } else {
        decode_q(text)?
    };

    // RFC 2231 allows a language suffix: `UTF-8*en`.
    let charset = charset.split('*').next().unwrap_or(charset);
    match charset.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => String::from_utf8(bytes).ok(),
        "iso-8859-1" | "latin1" | "latin-1" => Some(bytes.iter().map(|&b| char::from(b)).collect()),
        _ => None,
    }
}

fn decode_q(text: &str) -> Option<Vec<u8>> {
    let raw = text.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'_' => out.push(b' '),
            b'=' => {
                let hex = text.get(i + 1..i + 3)?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            b => out.push(b),
        }
        i += 1;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        let decoded = decode_encoded_words("José Publico");
        assert!(matches!(decoded, Cow::Borrowed(_)));
        assert_eq!(decoded, "José Publico");
    }

    #[test]
    fn decodes_base64_utf8() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?B?Sm9zw6kgUHVibGljbw==?="),
            "José Publico"
        );
    }

    #[test]
    fn decodes_q_encoding() {
        assert_eq!(
            decode_encoded_words("=?utf-8?Q?Jos=C3=A9_Publico?="),
            "José Publico"
        );
    }

    #[test]
    fn decodes_latin1() {
        assert_eq!(decode_encoded_words("=?ISO-8859-1?Q?Jos=E9?="), "José");
    }

    #[test]
    fn drops_whitespace_between_adjacent_words() {
        assert_eq!(
            decode_encoded_words("=?UTF-8?Q?Jos=C3=A9?= =?UTF-8?Q?_Publico?="),
            "José Publico"
        );
    }

    #[test]
    fn keeps_surrounding_text() {
        assert_eq!(
            decode_encoded_words("Dr. =?UTF-8?Q?Jos=C3=A9?= (work)"),
            "Dr. José (work)"
        );
    }

    #[test]
    fn unknown_charset_is_left_verbatim() {
        let raw = "=?x-unknown?Q?abc?=";
        assert_eq!(decode_encoded_words(raw), raw);
    }

    #[test]
    fn malformed_q_escape_is_left_verbatim() {
        let raw = "=?UTF-8?Q?bad=Z?=";
        assert_eq!(decode_encoded_words(raw), raw);
    }
}
