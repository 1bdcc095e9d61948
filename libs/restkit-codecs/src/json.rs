//! JSON codec.
//!
//! Top-level scalars are wrapped in a single-element array and a null
//! payload serializes as an empty object, so the wire never carries a bare
//! scalar document.

use restkit::{CodecError, Deserializer, Serializer};
use serde_json::Value;

pub const MEDIA_TYPES: &[&str] = &["application/json", "text/json"];

pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let framed = match value {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Array(_) | Value::Object(_) => value.clone(),
            scalar => Value::Array(vec![scalar.clone()]),
        };
        serde_json::to_vec(&framed).map_err(|err| CodecError::Malformed(err.to_string()))
    }
}

pub struct JsonDeserializer;

impl Deserializer for JsonDeserializer {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError::Malformed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn serialize(value: Value) -> String {
        String::from_utf8(JsonSerializer.serialize(&value).unwrap()).unwrap()
    }

    #[test]
    fn null_becomes_empty_object() {
        assert_eq!(serialize(Value::Null), "{}");
    }

    #[test]
    fn scalars_are_wrapped_in_an_array() {
        assert_eq!(serialize(json!(42)), "[42]");
        assert_eq!(serialize(json!(true)), "[true]");
    }

    #[test]
    fn arrays_pass_through() {
        assert_eq!(serialize(json!([1, [2, 4, 5], 3])), "[1,[2,4,5],3]");
    }

    #[test]
    fn objects_pass_through() {
        assert_eq!(serialize(json!({"q": "x"})), r#"{"q":"x"}"#);
    }

    #[test]
    fn round_trips_through_the_deserializer() {
        let bytes = JsonSerializer.serialize(&json!({"id": 1})).unwrap();
        let back = JsonDeserializer.deserialize(&bytes).unwrap();
        assert_eq!(back, json!({"id": 1}));
    }

    #[test]
    fn malformed_payload_is_an_error() {
        let err = JsonDeserializer.deserialize(b"{not json").unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }
}
