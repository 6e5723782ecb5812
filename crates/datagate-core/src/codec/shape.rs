//! Static shape detection for the envelope decision.
//!
//! A type's shape is read off its `Deserialize` implementation: the type is
//! driven against `ShapeProbe`, a deserializer that never yields data and
//! only records which `deserialize_*` entry point was requested first. The
//! answer therefore depends on `T` alone, never on a particular value, so
//! encoding and decoding always agree.

use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use std::fmt;

/// How a type sits at the top level of an encoded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Keyed structure (record or map); encoded as the document itself.
    Bare,
    /// Scalar, string, sequence, option, enum or self-describing value;
    /// encoded inside a single-field envelope.
    Enveloped,
}

/// Determine the shape of `T`.
///
/// | requested by `T::deserialize`          | shape                |
/// |----------------------------------------|----------------------|
/// | `deserialize_struct`, `deserialize_map` | `Bare`              |
/// | `deserialize_newtype_struct`           | shape of inner type  |
/// | anything else                          | `Enveloped`          |
pub fn shape_of<T: DeserializeOwned>() -> Shape {
    match T::deserialize(ShapeProbe) {
        Err(Probed::Found(shape)) => shape,
        // The impl failed on its own terms; wrapping always round-trips.
        Err(Probed::Custom(_)) | Ok(_) => Shape::Enveloped,
    }
}

#[derive(Debug)]
enum Probed {
    Found(Shape),
    Custom(String),
}

impl fmt::Display for Probed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probed::Found(shape) => write!(f, "probed shape {:?}", shape),
            Probed::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for Probed {}

impl de::Error for Probed {
    fn custom<M: fmt::Display>(msg: M) -> Self {
        Probed::Custom(msg.to_string())
    }
}

struct ShapeProbe;

impl<'de> Deserializer<'de> for ShapeProbe {
    type Error = Probed;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Probed> {
        Err(Probed::Found(Shape::Enveloped))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Probed> {
        Err(Probed::Found(Shape::Bare))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Probed> {
        Err(Probed::Found(Shape::Bare))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Probed> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple tuple_struct enum
        identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::{BTreeMap, HashMap};

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Settings {
        volume: f64,
        name: String,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Meters(f64);

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Wrapped(Settings);

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Flattened {
        #[serde(flatten)]
        rest: HashMap<String, u32>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    enum Difficulty {
        Easy,
        Hard,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Pair(u8, u8);

    #[test]
    fn test_scalars_are_enveloped() {
        assert_eq!(shape_of::<i32>(), Shape::Enveloped);
        assert_eq!(shape_of::<u64>(), Shape::Enveloped);
        assert_eq!(shape_of::<f32>(), Shape::Enveloped);
        assert_eq!(shape_of::<bool>(), Shape::Enveloped);
        assert_eq!(shape_of::<char>(), Shape::Enveloped);
        assert_eq!(shape_of::<String>(), Shape::Enveloped);
    }

    #[test]
    fn test_collections_and_options_are_enveloped() {
        assert_eq!(shape_of::<Vec<String>>(), Shape::Enveloped);
        assert_eq!(shape_of::<[u8; 4]>(), Shape::Enveloped);
        assert_eq!(shape_of::<(u8, String)>(), Shape::Enveloped);
        assert_eq!(shape_of::<Option<Settings>>(), Shape::Enveloped);
        assert_eq!(shape_of::<Pair>(), Shape::Enveloped);
        assert_eq!(shape_of::<Difficulty>(), Shape::Enveloped);
        assert_eq!(shape_of::<serde_json::Value>(), Shape::Enveloped);
    }

    #[test]
    fn test_records_and_maps_are_bare() {
        assert_eq!(shape_of::<Settings>(), Shape::Bare);
        assert_eq!(shape_of::<HashMap<String, i32>>(), Shape::Bare);
        assert_eq!(shape_of::<BTreeMap<String, Settings>>(), Shape::Bare);
        assert_eq!(shape_of::<Flattened>(), Shape::Bare);
    }

    #[test]
    fn test_wrappers_follow_inner_type() {
        assert_eq!(shape_of::<Meters>(), Shape::Enveloped);
        assert_eq!(shape_of::<Wrapped>(), Shape::Bare);
        assert_eq!(shape_of::<Box<Settings>>(), Shape::Bare);
        assert_eq!(shape_of::<Box<Vec<u8>>>(), Shape::Enveloped);
    }
}
