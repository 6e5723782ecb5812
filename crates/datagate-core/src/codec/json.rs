//! Pretty-printed JSON codec with the single-field envelope.

use super::shape::{shape_of, Shape};
use super::Codec;
use crate::error::{DatagateError, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// When [`JsonCodec`] wraps values in `{ "value": ... }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvelopePolicy {
    /// Wrap everything whose static shape is not a keyed structure.
    #[default]
    Auto,
    /// Wrap every value.
    Always,
    /// Never wrap; `serde_json` writes bare scalars and arrays fine.
    Never,
}

/// JSON codec backed by `serde_json`.
///
/// Documents are pretty printed so stored files stay diffable.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    policy: EnvelopePolicy,
}

// The field name is the on-disk envelope key.
#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    value: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    value: T,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: EnvelopePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EnvelopePolicy {
        self.policy
    }

    /// Whether values of type `T` get the envelope under this codec's policy.
    pub fn wraps<T: DeserializeOwned>(&self) -> bool {
        match self.policy {
            EnvelopePolicy::Auto => shape_of::<T>() == Shape::Enveloped,
            EnvelopePolicy::Always => true,
            EnvelopePolicy::Never => false,
        }
    }
}

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        let encoded = if self.wraps::<T>() {
            serde_json::to_vec_pretty(&EnvelopeRef { value })
        } else {
            serde_json::to_vec_pretty(value)
        };

        encoded.map_err(|e| DatagateError::Json {
            message: format!("Failed to serialize data: {}", e),
            source: Some(e),
        })
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        let decoded = if self.wraps::<T>() {
            serde_json::from_slice::<Envelope<T>>(bytes).map(|envelope| envelope.value)
        } else {
            serde_json::from_slice::<T>(bytes)
        };

        decoded.map_err(|e| DatagateError::Json {
            message: format!("Failed to parse document: {}", e),
            source: Some(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Settings {
        volume: f64,
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Difficulty {
        Easy,
        Nightmare { lives: u8 },
    }

    fn round_trip<T>(codec: &JsonCodec, value: T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = codec.encode(&value).unwrap();
        let decoded: T = codec.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_round_trip_enveloped_shapes() {
        let codec = JsonCodec::new();
        round_trip(&codec, 42i64);
        round_trip(&codec, -0.25f64);
        round_trip(&codec, true);
        round_trip(&codec, "hello".to_string());
        round_trip(&codec, vec![1u32, 2, 3]);
        round_trip(&codec, Vec::<String>::new());
        round_trip(&codec, Some(7u8));
        round_trip(&codec, None::<u8>);
        round_trip(&codec, Difficulty::Easy);
        round_trip(&codec, Difficulty::Nightmare { lives: 1 });
    }

    #[test]
    fn test_round_trip_bare_shapes() {
        let codec = JsonCodec::new();
        round_trip(
            &codec,
            Settings {
                volume: 0.5,
                name: "p1".into(),
            },
        );

        let mut scores = HashMap::new();
        scores.insert("alice".to_string(), 10u32);
        round_trip(&codec, scores);
    }

    #[test]
    fn test_envelope_layout() {
        let codec = JsonCodec::new();

        let bytes = codec.encode(&42i32).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc.get("value"), Some(&serde_json::json!(42)));

        let settings = Settings {
            volume: 0.5,
            name: "p1".into(),
        };
        let bytes = codec.encode(&settings).unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc, serde_json::json!({ "volume": 0.5, "name": "p1" }));
    }

    #[test]
    fn test_policies() {
        let never = JsonCodec::with_policy(EnvelopePolicy::Never);
        assert_eq!(never.encode(&42i32).unwrap(), b"42");
        round_trip(&never, vec!["a".to_string()]);

        let always = JsonCodec::with_policy(EnvelopePolicy::Always);
        let settings = Settings {
            volume: 1.0,
            name: "p2".into(),
        };
        let doc: serde_json::Value =
            serde_json::from_slice(&always.encode(&settings).unwrap()).unwrap();
        assert!(doc.get("value").is_some());
        round_trip(&always, settings);
    }

    #[test]
    fn test_malformed_payload_is_an_error() {
        let codec = JsonCodec::new();

        let err = Codec::<Settings>::decode(&codec, b"{ not json").unwrap_err();
        assert!(err.is_malformed_payload());

        // A bare scalar where an envelope is expected
        let err = Codec::<i32>::decode(&codec, b"42").unwrap_err();
        assert!(err.is_malformed_payload());
    }
}
