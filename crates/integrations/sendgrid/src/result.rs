use tracing::warn;

use crate::error::SendgridError;
use crate::types::SendgridResponse;

/// Turn a parsed API response into the delivery outcome.
///
/// A response carrying a non-empty `error` becomes
/// [`SendgridError::Delivery`] with the API's message; anything else is
/// returned unchanged.
pub fn map_result(response: SendgridResponse) -> Result<SendgridResponse, SendgridError> {
    match response.error_message() {
        Some(message) => {
            warn!(error = %message, "SendGrid reported a delivery failure");
            Err(SendgridError::Delivery(message))
        }
        None => Ok(response),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn success_is_returned_unchanged() {
        let response = SendgridResponse::new(json!({"message": "success", "id": 7}));
        let mapped = map_result(response.clone()).unwrap();
        assert_eq!(mapped, response);
    }

    #[test]
    fn error_message_is_carried_verbatim() {
        let response = SendgridResponse::new(json!({"error": {"message": "Something went wrong"}}));
        match map_result(response) {
            Err(SendgridError::Delivery(message)) => assert_eq!(message, "Something went wrong"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn null_error_is_success() {
        let response = SendgridResponse::new(json!({"message": "success", "error": null}));
        assert!(map_result(response).is_ok());
    }
}
