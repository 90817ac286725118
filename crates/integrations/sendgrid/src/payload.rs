use mailgate_core::{AddressList, Message, extract_headers, parse_addresses};
use tracing::debug;

use crate::error::SendgridError;
use crate::types::SendRequest;

/// API method used for delivery.
pub const SEND_PATH: &str = "send";

const RETURN_PATH: &str = "Return-Path";
const REPLY_TO: &str = "Reply-To";

/// A request ready for the transport, plus the routing blob that travels
/// beside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedDelivery {
    pub request: SendRequest,
    /// Verbatim `X-SMTPAPI` header value.
    pub smtpapi: Option<String>,
}

/// Fail unless the message has a sender, a recipient and a non-empty text
/// or HTML body.
pub fn check_delivery_params(message: &Message) -> Result<(), SendgridError> {
    if is_blank(message.from.as_ref()) {
        return Err(SendgridError::Validation("message has no sender".into()));
    }
    if is_blank(message.to.as_ref()) {
        return Err(SendgridError::Validation("message has no recipients".into()));
    }
    if message.text().is_none() && message.html().is_none() {
        return Err(SendgridError::Validation(
            "message has neither a text nor an HTML body".into(),
        ));
    }
    Ok(())
}

/// Validate `message` and build the `mail.send` request.
///
/// Writes back onto the message: `Return-Path` is set to the sender when
/// absent, and `Reply-To` is replaced by the first reply-to address when the
/// message has one. Both writes are idempotent, so preparing the same message
/// twice yields identical requests.
pub fn prepare(message: &mut Message) -> Result<PreparedDelivery, SendgridError> {
    check_delivery_params(message)?;

    let (Some(from_field), Some(to_field)) = (message.from.as_ref(), message.to.as_ref()) else {
        return Err(SendgridError::Validation("missing required mail part".into()));
    };

    let to = parse_addresses(to_field)?;

    let bcc = match message.bcc.as_ref().filter(|list| !list.is_blank()) {
        Some(list) => {
            let addresses: Vec<String> = parse_addresses(list)?
                .into_iter()
                .map(|address| address.address)
                .collect();
            (!addresses.is_empty()).then_some(addresses)
        }
        None => None,
    };

    // Only the first sender is used.
    let sender = parse_addresses(from_field)?
        .into_iter()
        .next()
        .ok_or_else(|| SendgridError::Validation("message has no sender".into()))?;

    let reply_to = match message.reply_to.as_ref().filter(|list| !list.is_blank()) {
        Some(list) => parse_addresses(list)?.into_iter().next(),
        None => None,
    };

    if !message.headers.contains(RETURN_PATH) {
        message.headers.set(RETURN_PATH, sender.address.clone());
    }
    if let Some(reply_to) = reply_to {
        message.headers.set(REPLY_TO, reply_to.encoded()?);
    }

    let smtpapi = message.smtpapi().map(str::to_owned);
    let headers = extract_headers(message).to_json()?;

    debug!(
        recipients = to.len(),
        bcc = bcc.as_ref().map_or(0, Vec::len),
        routing = smtpapi.is_some(),
        "built SendGrid payload"
    );

    let request = SendRequest {
        toname: to.iter().map(|a| a.display_name.clone()).collect(),
        to: to.into_iter().map(|a| a.address).collect(),
        from: sender.address,
        fromname: sender.display_name,
        bcc,
        subject: message.subject.clone().unwrap_or_default(),
        text: message.text().map(str::to_owned),
        html: message.html().map(str::to_owned),
        headers,
    };

    Ok(PreparedDelivery { request, smtpapi })
}

fn is_blank(field: Option<&AddressList>) -> bool {
    field.is_none_or(AddressList::is_blank)
}

#[cfg(test)]
mod tests {
    use mailgate_core::{Address, AddressError};

    use super::*;

    fn base_message() -> Message {
        Message::new()
            .with_from(Address::new("from@address.com").with_display_name("Tester"))
            .with_to("to@address.com")
            .with_subject("Welcome aboard")
            .with_text_body("This is plain text")
    }

    fn headers_json(prepared: &PreparedDelivery) -> serde_json::Value {
        serde_json::from_str(&prepared.request.headers).unwrap()
    }

    #[test]
    fn builds_basic_request() {
        let mut message = base_message()
            .with_bcc("bcc@address.com")
            .with_header("X-SMTPAPI", r#"{"filters":{"opentrack":{"settings":{"enable":1}}}}"#);

        let prepared = prepare(&mut message).unwrap();
        let request = &prepared.request;

        assert_eq!(request.to, vec!["to@address.com"]);
        assert_eq!(request.toname, vec![None]);
        assert_eq!(request.from, "from@address.com");
        assert_eq!(request.fromname.as_deref(), Some("Tester"));
        assert_eq!(request.bcc, Some(vec!["bcc@address.com".to_owned()]));
        assert_eq!(request.subject, "Welcome aboard");
        assert_eq!(request.text.as_deref(), Some("This is plain text"));
        assert_eq!(request.html, None);
        assert_eq!(
            prepared.smtpapi.as_deref(),
            Some(r#"{"filters":{"opentrack":{"settings":{"enable":1}}}}"#)
        );
    }

    #[test]
    fn multiple_named_recipients_stay_aligned() {
        let mut message = base_message().with_to(vec![
            "Tester <to@address.com>",
            "Another <and@address.com>",
        ]);
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(request.to, vec!["to@address.com", "and@address.com"]);
        assert_eq!(
            request.toname,
            vec![Some("Tester".to_owned()), Some("Another".to_owned())]
        );
    }

    #[test]
    fn comma_separated_recipients() {
        let mut message = base_message().with_to("to@address.com, and@address.com");
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(request.to, vec!["to@address.com", "and@address.com"]);
        assert_eq!(request.to.len(), request.toname.len());
    }

    #[test]
    fn bcc_is_reduced_to_bare_addresses() {
        let mut message =
            base_message().with_bcc(["Tester <bcc@address.com>", "Another <and@address.com>"]);
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(
            request.bcc,
            Some(vec!["bcc@address.com".to_owned(), "and@address.com".to_owned()])
        );
    }

    #[test]
    fn missing_or_blank_bcc_is_omitted() {
        let mut message = base_message();
        let request = prepare(&mut message).unwrap().request;
        assert!(request.bcc.is_none());
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.as_object().unwrap().get("bcc").is_none());

        let mut message = base_message().with_bcc(AddressList::new());
        assert!(prepare(&mut message).unwrap().request.bcc.is_none());
    }

    #[test]
    fn only_first_sender_is_used() {
        let mut message = base_message()
            .with_from(r#""Tester" <from@address.com>, Another tester <from2@address.com>"#);
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(request.from, "from@address.com");
        assert_eq!(request.fromname.as_deref(), Some("Tester"));
    }

    #[test]
    fn return_path_is_injected_when_absent() {
        let mut message = base_message();
        let prepared = prepare(&mut message).unwrap();
        assert_eq!(message.headers.get("Return-Path"), Some("from@address.com"));
        assert_eq!(headers_json(&prepared)["Return-Path"], "from@address.com");
    }

    #[test]
    fn existing_return_path_is_kept() {
        let mut message = base_message().with_header("Return-Path", "bounces@address.com");
        prepare(&mut message).unwrap();
        assert_eq!(message.headers.get("Return-Path"), Some("bounces@address.com"));
    }

    #[test]
    fn reply_to_is_normalized_to_first_address() {
        let mut message = base_message()
            .with_reply_to(r#""Reply" <reply@address.com>, other@address.com"#)
            .with_header("Reply-To", "stale@address.com");
        let prepared = prepare(&mut message).unwrap();

        assert_eq!(
            message.headers.get("Reply-To"),
            Some("Reply <reply@address.com>")
        );
        assert_eq!(headers_json(&prepared)["Reply-To"], "Reply <reply@address.com>");
    }

    #[test]
    fn headers_exclude_reserved_fields() {
        let mut message = base_message()
            .with_header("To", "to@address.com")
            .with_header("Subject", "Welcome aboard")
            .with_header("X-SMTPAPI", "{}")
            .with_header("Content-Type", "multipart/mixed");
        let json = headers_json(&prepare(&mut message).unwrap());
        let map = json.as_object().unwrap();
        assert!(!map.contains_key("To"));
        assert!(!map.contains_key("Subject"));
        assert!(!map.contains_key("X-SMTPAPI"));
        assert_eq!(map["Content-Type"], "multipart/mixed");
    }

    #[test]
    fn empty_bodies_become_false() {
        let mut message = base_message().with_text_body("").with_html_body("<p>hi</p>");
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(request.text, None);
        assert_eq!(request.html.as_deref(), Some("<p>hi</p>"));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["text"], false);
    }

    #[test]
    fn missing_subject_is_empty() {
        let mut message = base_message();
        message.subject = None;
        assert_eq!(prepare(&mut message).unwrap().request.subject, "");
    }

    #[test]
    fn preparing_twice_is_idempotent() {
        let mut message = base_message()
            .with_reply_to(Address::new("reply@address.com").with_display_name("Reply"))
            .with_bcc("bcc@address.com");
        let first = prepare(&mut message).unwrap();
        let after_first = message.clone();
        let second = prepare(&mut message).unwrap();
        assert_eq!(first, second);
        assert_eq!(message, after_first);
    }

    #[test]
    fn validation_requires_sender_recipient_and_body() {
        let err = check_delivery_params(&Message::new()).unwrap_err();
        assert!(matches!(err, SendgridError::Validation(_)));

        let no_to = Message::new()
            .with_from("from@address.com")
            .with_text_body("hi");
        assert!(matches!(
            check_delivery_params(&no_to),
            Err(SendgridError::Validation(_))
        ));

        let blank_from = Message::new()
            .with_from("  ")
            .with_to("to@address.com")
            .with_text_body("hi");
        assert!(matches!(
            check_delivery_params(&blank_from),
            Err(SendgridError::Validation(_))
        ));

        let no_body = Message::new()
            .with_from("from@address.com")
            .with_to("to@address.com")
            .with_text_body("")
            .with_html_body("");
        assert!(matches!(
            check_delivery_params(&no_body),
            Err(SendgridError::Validation(_))
        ));

        let html_only = Message::new()
            .with_from("from@address.com")
            .with_to("to@address.com")
            .with_html_body("<p>hi</p>");
        assert!(check_delivery_params(&html_only).is_ok());
    }

    #[test]
    fn validation_failure_leaves_message_untouched() {
        let mut message = Message::new().with_from("from@address.com").with_to("to@address.com");
        let before = message.clone();
        assert!(prepare(&mut message).is_err());
        assert_eq!(message, before);
    }

    #[test]
    fn unparsable_recipient_propagates_address_error() {
        let mut message = base_message().with_to("not-an-email");
        let err = prepare(&mut message).unwrap_err();
        assert!(matches!(
            err,
            SendgridError::Address(AddressError::Invalid { .. })
        ));
    }

    #[test]
    fn idn_recipients_are_ace_encoded() {
        let mut message = base_message().with_to(r#""andrè "the" gïant" <to@àddress.com>"#);
        let request = prepare(&mut message).unwrap().request;
        assert_eq!(request.to, vec!["xn--to@ddress-s1a.com"]);
        assert_eq!(request.toname, vec![Some(r#"andrè "the" gïant"#.to_owned())]);
    }
}
