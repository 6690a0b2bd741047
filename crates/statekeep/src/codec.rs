//! Codecs converting state sub-trees to and from their stored text form.
//!
//! The default codec is compact JSON. Any leaf of a
//! [`KeySpec`](crate::keyspec::KeySpec) may override either direction with
//! a [`CodecOverride`]; the missing direction keeps using the default.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// Encodes a state value into its stored string.
pub type SerializeFn = Arc<dyn Fn(&Value) -> anyhow::Result<String> + Send + Sync>;

/// Decodes a stored string back into a state value.
pub type DeserializeFn = Arc<dyn Fn(&str) -> anyhow::Result<Value> + Send + Sync>;

/// A paired encode/decode function set.
#[derive(Clone)]
pub struct Codec {
    pub serialize: SerializeFn,
    pub deserialize: DeserializeFn,
}

impl Codec {
    /// Standard JSON encode/decode.
    pub fn json() -> Self {
        Self {
            serialize: Arc::new(json_serialize),
            deserialize: Arc::new(json_deserialize),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::json()
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

fn json_serialize(value: &Value) -> anyhow::Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn json_deserialize(text: &str) -> anyhow::Result<Value> {
    Ok(serde_json::from_str(text)?)
}

/// Per-leaf codec override. At least one direction is always present.
#[derive(Clone)]
pub struct CodecOverride {
    serialize: Option<SerializeFn>,
    deserialize: Option<DeserializeFn>,
}

impl CodecOverride {
    /// Override both directions.
    pub fn new<S, D>(serialize: S, deserialize: D) -> Self
    where
        S: Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
        D: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            serialize: Some(Arc::new(serialize)),
            deserialize: Some(Arc::new(deserialize)),
        }
    }

    /// Override encoding only.
    pub fn serialize<S>(serialize: S) -> Self
    where
        S: Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            serialize: Some(Arc::new(serialize)),
            deserialize: None,
        }
    }

    /// Override decoding only.
    pub fn deserialize<D>(deserialize: D) -> Self
    where
        D: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            serialize: None,
            deserialize: Some(Arc::new(deserialize)),
        }
    }

    /// Builder method: add or replace the encode direction.
    pub fn with_serialize<S>(self, serialize: S) -> Self
    where
        S: Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            serialize: Some(Arc::new(serialize)),
            ..self
        }
    }

    /// Builder method: add or replace the decode direction.
    pub fn with_deserialize<D>(self, deserialize: D) -> Self
    where
        D: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            deserialize: Some(Arc::new(deserialize)),
            ..self
        }
    }

    pub fn serialize_fn<'a>(&'a self, default: &'a SerializeFn) -> &'a SerializeFn {
        self.serialize.as_ref().unwrap_or(default)
    }

    pub fn deserialize_fn<'a>(&'a self, default: &'a DeserializeFn) -> &'a DeserializeFn {
        self.deserialize.as_ref().unwrap_or(default)
    }

    /// Fill in missing directions from `default`.
    pub fn resolve(&self, default: &Codec) -> Codec {
        Codec {
            serialize: self.serialize_fn(&default.serialize).clone(),
            deserialize: self.deserialize_fn(&default.deserialize).clone(),
        }
    }
}

impl fmt::Debug for CodecOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecOverride")
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_codec_is_compact() {
        let codec = Codec::json();
        let text = (codec.serialize)(&json!({"cartItems": {"FRT-001": 1}})).unwrap();
        assert_eq!(text, r#"{"cartItems":{"FRT-001":1}}"#);
    }

    #[test]
    fn json_codec_rejects_garbage() {
        let codec = Codec::json();
        assert!((codec.deserialize)("{not json").is_err());
    }

    #[test]
    fn override_falls_back_per_direction() {
        let over = CodecOverride::serialize(|_| Ok("custom".to_string()));
        let codec = over.resolve(&Codec::json());

        assert_eq!((codec.serialize)(&json!(1)).unwrap(), "custom");
        assert_eq!((codec.deserialize)("[1,2]").unwrap(), json!([1, 2]));
    }

    #[test]
    fn with_deserialize_completes_override() {
        let over = CodecOverride::serialize(|v| Ok(v.to_string()))
            .with_deserialize(|_| Ok(Value::Null));
        let codec = over.resolve(&Codec::json());
        assert_eq!((codec.deserialize)("42").unwrap(), Value::Null);
    }
}
