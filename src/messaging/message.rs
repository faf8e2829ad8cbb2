//! Message decoding
//!
//! Turns a raw queue body into a [`DocumentObj`]. Decoding has no side
//! effects; failures are returned to the dispatcher, which owns the error
//! boundary.

use serde_json::Value;

use super::errors::DecodeError;
use super::routing::RoutingKey;
use crate::documents::DocumentObj;

/// A decoded message, alive for one dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub routing_key: RoutingKey,
    pub document: DocumentObj,
}

impl Message {
    pub fn new(routing_key: RoutingKey, document: DocumentObj) -> Self {
        Self {
            routing_key,
            document,
        }
    }

    /// Decode a raw body received under `routing_key`
    pub fn decode(routing_key: RoutingKey, raw: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::new(routing_key, decode(raw)?))
    }

    pub fn collection(&self) -> Option<&str> {
        self.document.collection.as_deref()
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.document.doc_id.as_deref()
    }
}

/// Parse UTF-8 JSON into a document, taking identity from `@uuid` and `collection`
pub fn decode(raw: &[u8]) -> Result<DocumentObj, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::invalid_utf8(e.to_string()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::malformed_json(e.to_string()))?;

    match value {
        Value::Object(data) => Ok(DocumentObj::new(data)),
        other => Err(DecodeError::not_an_object(json_type_name(&other))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_document() {
        let raw = br#"{"@uuid": "1", "collection": "elasticsearch.test_index.mail", "title": "foo"}"#;
        let message = Message::decode(RoutingKey::Monitors, raw).unwrap();
        assert_eq!(message.doc_id(), Some("1"));
        assert_eq!(message.collection(), Some("elasticsearch.test_index.mail"));
        assert_eq!(message.document.data["title"], "foo");
    }

    #[test]
    fn test_decode_without_identity() {
        let document = decode(br#"{"message": "hello"}"#).unwrap();
        assert!(document.doc_id.is_none());
        assert!(document.collection.is_none());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode(&[0xff, 0xfe, 0x00]),
            Err(DecodeError::InvalidUtf8 { .. })
        ));
        assert!(matches!(
            decode(b"{not json"),
            Err(DecodeError::MalformedJson { .. })
        ));
        assert_eq!(
            decode(b"[1, 2]"),
            Err(DecodeError::not_an_object("array"))
        );
    }
}
