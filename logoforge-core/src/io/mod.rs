//! Reading and writing scenes as records for a persistence store.

pub mod payload;

pub use payload::{EmbeddedAsset, Payload, PayloadError};

/// Serde adapter writing byte buffers as standard base64 strings.
pub(crate) mod base64_bytes {
    use base64::Engine;

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str =
            <std::borrow::Cow<'de, str> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(str.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
