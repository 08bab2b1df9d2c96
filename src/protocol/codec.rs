//! JSON encoding of messages.
//!
//! The pool only depends on this pair agreeing with clients; nothing else
//! inspects the encoded form.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{from_str, to_string};

use crate::error::Result;

use super::Message;

// ============================================================================
// Functions
// ============================================================================

/// Encodes a message as a JSON object.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
#[inline]
pub fn encode(message: &Message) -> Result<String> {
    Ok(to_string(message)?)
}

/// Decodes a JSON object into a message.
///
/// # Errors
///
/// Returns [`Error::Json`](crate::Error::Json) for malformed input or an
/// unknown `type` code.
#[inline]
pub fn decode(text: &str) -> Result<Message> {
    Ok(from_str(text)?)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::protocol::FrameKind;

    #[test]
    fn test_encode_field_names() {
        let json = encode(&Message::text("User 0 says hi")).expect("encode");
        assert_eq!(json, r#"{"type":1,"body":"User 0 says hi"}"#);
    }

    #[test]
    fn test_decode_binary_kind() {
        let message = decode(r#"{"type":2,"body":"x"}"#).expect("decode");
        assert_eq!(message.kind(), FrameKind::Binary);
        assert_eq!(message.body(), "x");
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let result = decode(r#"{"type":7,"body":"x"}"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_decode_rejects_missing_body() {
        assert!(decode(r#"{"type":1}"#).is_err());
    }
}
