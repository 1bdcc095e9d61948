//! Stock codec implementations for restkit resources.
//!
//! The core crate only knows codec traits and media-type declarations; the
//! byte-level syntax lives here. `register_defaults` installs both codecs
//! under the keys resources usually name in `allowed_serializers` /
//! `allowed_deserializers`: `"json"` and `"url"`.

use std::sync::Arc;

use restkit::CodecRegistry;

pub mod json;
pub mod url;

pub use json::{JsonDeserializer, JsonSerializer};
pub use url::{UrlDeserializer, UrlSerializer};

/// Install the stock codecs under their conventional keys.
pub fn register_defaults(codecs: &CodecRegistry) {
    codecs.register_serializer("json", Arc::new(JsonSerializer));
    codecs.register_deserializer("json", Arc::new(JsonDeserializer));
    codecs.register_serializer("url", Arc::new(UrlSerializer));
    codecs.register_deserializer("url", Arc::new(UrlDeserializer));
}

#[cfg(test)]
mod tests {
    use super::*;
    use restkit::NegotiationMap;

    #[test]
    fn default_registration_builds_a_negotiation_map() {
        let codecs = CodecRegistry::new();
        register_defaults(&codecs);

        let map = NegotiationMap::build(
            &codecs,
            &["json".into(), "url".into()],
            &["json".into(), "url".into()],
        )
        .unwrap();

        assert_eq!(map.serializer_for("application/json"), Some("json"));
        assert_eq!(
            map.deserializer_for("application/x-www-form-urlencoded"),
            Some("url")
        );
        assert_eq!(map.serializer_for("text/html"), None);
        assert_eq!(map.canonical_media_type("json"), Some("application/json"));
    }
}
