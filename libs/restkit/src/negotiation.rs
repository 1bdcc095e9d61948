//! Content negotiation: mapping between declared codec capabilities and
//! wire media types.
//!
//! Each codec declares the ordered list of media types it accepts; the first
//! is its canonical type, used when writing a response with no explicit type
//! pinned. A resource's [`NegotiationMap`] is built once, at type
//! construction, from its allowed serializer/deserializer key lists. Lookup
//! here is exact-match only: wildcard and quality-value negotiation belongs
//! to the transport collaborator.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;

use crate::errors::{CodecError, ConfigError, ResourceError};

/// Writes values onto the wire.
pub trait Serializer: Send + Sync {
    /// Media types this serializer accepts, canonical/preferred first.
    fn media_types(&self) -> &'static [&'static str];

    /// Capability check that does not require executing the full encode.
    fn can_serialize(&self, _value: &Value) -> bool {
        true
    }

    fn serialize(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
}

/// Reads values off the wire.
pub trait Deserializer: Send + Sync {
    /// Media types this deserializer accepts, canonical first.
    fn media_types(&self) -> &'static [&'static str];

    fn deserialize(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Process-wide codec registry, keyed by codec name.
#[derive(Default)]
pub struct CodecRegistry {
    serializers: DashMap<String, Arc<dyn Serializer>>,
    deserializers: DashMap<String, Arc<dyn Deserializer>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_serializer(&self, key: impl Into<String>, codec: Arc<dyn Serializer>) {
        self.serializers.insert(key.into(), codec);
    }

    pub fn register_deserializer(&self, key: impl Into<String>, codec: Arc<dyn Deserializer>) {
        self.deserializers.insert(key.into(), codec);
    }

    pub fn serializer(&self, key: &str) -> Result<Arc<dyn Serializer>, ConfigError> {
        self.serializers
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConfigError::UnknownCodec {
                kind: "serializer",
                key: key.to_string(),
            })
    }

    pub fn deserializer(&self, key: &str) -> Result<Arc<dyn Deserializer>, ConfigError> {
        self.deserializers
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConfigError::UnknownCodec {
                kind: "deserializer",
                key: key.to_string(),
            })
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let serializers: Vec<String> = self.serializers.iter().map(|e| e.key().clone()).collect();
        let deserializers: Vec<String> =
            self.deserializers.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("CodecRegistry")
            .field("serializers", &serializers)
            .field("deserializers", &deserializers)
            .finish()
    }
}

/// Frozen per-resource lookup tables: media type to codec key, plus the
/// canonical media type per codec key.
#[derive(Debug, Clone, Default)]
pub struct NegotiationMap {
    serializer_by_media: HashMap<String, String>,
    deserializer_by_media: HashMap<String, String>,
    canonical_serializer: HashMap<String, String>,
    canonical_deserializer: HashMap<String, String>,
}

impl NegotiationMap {
    /// Build both tables from allowed codec key lists. Later keys do not
    /// displace earlier ones when two codecs claim the same media type; the
    /// declared order is the preference order. Unknown keys fail
    /// construction.
    pub fn build(
        registry: &CodecRegistry,
        allowed_serializers: &[String],
        allowed_deserializers: &[String],
    ) -> Result<NegotiationMap, ConfigError> {
        let mut map = NegotiationMap::default();

        for key in allowed_serializers {
            let codec = registry.serializer(key)?;
            let media_types = codec.media_types();
            if let Some(first) = media_types.first() {
                map.canonical_serializer
                    .insert(key.clone(), (*first).to_string());
            }
            for media_type in media_types {
                map.serializer_by_media
                    .entry((*media_type).to_string())
                    .or_insert_with(|| key.clone());
            }
        }

        for key in allowed_deserializers {
            let codec = registry.deserializer(key)?;
            let media_types = codec.media_types();
            if let Some(first) = media_types.first() {
                map.canonical_deserializer
                    .insert(key.clone(), (*first).to_string());
            }
            for media_type in media_types {
                map.deserializer_by_media
                    .entry((*media_type).to_string())
                    .or_insert_with(|| key.clone());
            }
        }

        Ok(map)
    }

    /// Which serializer key handles this exact media type, if any.
    pub fn serializer_for(&self, media_type: &str) -> Option<&str> {
        self.serializer_by_media.get(media_type).map(String::as_str)
    }

    /// Which deserializer key handles this exact media type, if any.
    pub fn deserializer_for(&self, media_type: &str) -> Option<&str> {
        self.deserializer_by_media
            .get(media_type)
            .map(String::as_str)
    }

    /// Like [`NegotiationMap::serializer_for`], but a miss is the
    /// transport-facing 415 outcome rather than an option.
    pub fn require_serializer(&self, media_type: &str) -> Result<&str, ResourceError> {
        self.serializer_for(media_type)
            .ok_or_else(|| ResourceError::UnsupportedMedia {
                media_type: media_type.to_string(),
            })
    }

    /// Like [`NegotiationMap::deserializer_for`], for request payloads.
    pub fn require_deserializer(&self, media_type: &str) -> Result<&str, ResourceError> {
        self.deserializer_for(media_type)
            .ok_or_else(|| ResourceError::UnsupportedMedia {
                media_type: media_type.to_string(),
            })
    }

    /// Canonical media type for a serializer key; used when writing a
    /// response with no explicit type pinned.
    pub fn canonical_media_type(&self, key: &str) -> Option<&str> {
        self.canonical_serializer.get(key).map(String::as_str)
    }

    pub fn canonical_deserializer_media_type(&self, key: &str) -> Option<&str> {
        self.canonical_deserializer.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCodec(&'static [&'static str]);

    impl Serializer for FakeCodec {
        fn media_types(&self) -> &'static [&'static str] {
            self.0
        }

        fn serialize(&self, _value: &Value) -> Result<Vec<u8>, CodecError> {
            Ok(Vec::new())
        }
    }

    impl Deserializer for FakeCodec {
        fn media_types(&self) -> &'static [&'static str] {
            self.0
        }

        fn deserialize(&self, _bytes: &[u8]) -> Result<Value, CodecError> {
            Ok(Value::Null)
        }
    }

    fn registry() -> CodecRegistry {
        let registry = CodecRegistry::new();
        registry.register_serializer(
            "json",
            Arc::new(FakeCodec(&["application/json", "text/json"])),
        );
        registry.register_serializer(
            "url",
            Arc::new(FakeCodec(&["application/x-www-form-urlencoded"])),
        );
        registry.register_deserializer("json", Arc::new(FakeCodec(&["application/json"])));
        registry
    }

    #[test]
    fn maps_media_type_to_codec_key() {
        let map = NegotiationMap::build(
            &registry(),
            &["json".into(), "url".into()],
            &["json".into()],
        )
        .unwrap();

        assert_eq!(map.serializer_for("application/json"), Some("json"));
        assert_eq!(
            map.serializer_for("application/x-www-form-urlencoded"),
            Some("url")
        );
        assert_eq!(map.deserializer_for("application/json"), Some("json"));
        // Exact match only: unknown types have no entry.
        assert_eq!(map.serializer_for("text/html"), None);
    }

    #[test]
    fn first_declared_media_type_is_canonical() {
        let map = NegotiationMap::build(&registry(), &["json".into()], &[]).unwrap();
        assert_eq!(map.canonical_media_type("json"), Some("application/json"));
    }

    #[test]
    fn unnegotiable_media_type_is_unsupported() {
        let map = NegotiationMap::build(&registry(), &["json".into()], &["json".into()]).unwrap();
        assert_eq!(map.require_serializer("application/json").unwrap(), "json");

        let err = map.require_serializer("text/html").unwrap_err();
        assert!(
            matches!(err, ResourceError::UnsupportedMedia { ref media_type } if media_type == "text/html")
        );
        assert!(map.require_deserializer("text/xml").is_err());
    }

    #[test]
    fn unknown_codec_key_fails_construction() {
        let err = NegotiationMap::build(&registry(), &["xml".into()], &[]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCodec { .. }));
    }
}
