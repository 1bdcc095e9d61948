//! `application/x-www-form-urlencoded` codec.
//!
//! Decoding groups repeated keys into arrays, so `a=1&a=2` yields
//! `{"a": ["1", "2"]}` and every decoded value is a list of strings.
//! Encoding only handles flat objects; the capability check refuses nested
//! structures before any bytes are written, which is what lets negotiation
//! probe this codec cheaply and fall back to another.

use restkit::{CodecError, Deserializer, Serializer};
use serde_json::{Map, Value};
use url::form_urlencoded;

pub const MEDIA_TYPES: &[&str] = &["application/x-www-form-urlencoded"];

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn encodable(object: &Map<String, Value>) -> bool {
    object.values().all(|value| match value {
        Value::Array(items) => items.iter().all(|item| scalar_text(item).is_some()),
        other => scalar_text(other).is_some() || other.is_null(),
    })
}

pub struct UrlSerializer;

impl Serializer for UrlSerializer {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn can_serialize(&self, value: &Value) -> bool {
        match value {
            Value::Object(object) => encodable(object),
            _ => false,
        }
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let Value::Object(object) = value else {
            return Err(CodecError::Unsupported);
        };
        if !encodable(object) {
            return Err(CodecError::Unsupported);
        }

        let mut encoder = form_urlencoded::Serializer::new(String::new());
        for (key, value) in object {
            match value {
                Value::Array(items) => {
                    for item in items {
                        // encodable() vouched for every item.
                        if let Some(text) = scalar_text(item) {
                            encoder.append_pair(key, &text);
                        }
                    }
                }
                Value::Null => {
                    encoder.append_pair(key, "");
                }
                other => {
                    if let Some(text) = scalar_text(other) {
                        encoder.append_pair(key, &text);
                    }
                }
            }
        }
        Ok(encoder.finish().into_bytes())
    }
}

pub struct UrlDeserializer;

impl Deserializer for UrlDeserializer {
    fn media_types(&self) -> &'static [&'static str] {
        MEDIA_TYPES
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let mut object = Map::new();
        for (name, value) in form_urlencoded::parse(bytes) {
            let entry = object
                .entry(name.into_owned())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(values) = entry {
                values.push(Value::String(value.into_owned()));
            }
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_keys_group_into_arrays() {
        let value = UrlDeserializer.deserialize(b"a=1&a=2&b=x").unwrap();
        assert_eq!(value, json!({"a": ["1", "2"], "b": ["x"]}));
    }

    #[test]
    fn blank_values_are_kept() {
        let value = UrlDeserializer.deserialize(b"a=&b=1").unwrap();
        assert_eq!(value, json!({"a": [""], "b": ["1"]}));
    }

    #[test]
    fn flat_objects_encode() {
        let bytes = UrlSerializer
            .serialize(&json!({"id": 1, "q": "innie outie"}))
            .unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "id=1&q=innie+outie"
        );
    }

    #[test]
    fn nested_values_are_refused_without_encoding() {
        let nested = json!({"a": {"b": 1}});
        assert!(!UrlSerializer.can_serialize(&nested));
        let err = UrlSerializer.serialize(&nested).unwrap_err();
        assert!(matches!(err, CodecError::Unsupported));
    }

    #[test]
    fn non_objects_are_refused() {
        assert!(!UrlSerializer.can_serialize(&json!([1, 2])));
        assert!(matches!(
            UrlSerializer.serialize(&json!(42)).unwrap_err(),
            CodecError::Unsupported
        ));
    }
}
