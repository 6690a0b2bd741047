//! Path-addressed reconstruction and extraction of state sub-trees.
//!
//! [`reconstruct`] reads every leaf of a [`KeySpec`] from storage and
//! reassembles the decoded values into the nested shape of the host state.
//! [`extract`] walks the same spec against a live state tree and yields one
//! `(storage key, encoded value)` pair per leaf.
//!
//! Both walks share the same addressing rule: a leaf's storage key is the
//! dot-joined field names from the spec root.

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::codec::{DeserializeFn, SerializeFn};
use crate::error::{PersistError, PersistResult};
use crate::keyspec::{join_path, KeyNode, KeySpec};
use crate::storage::StorageBackend;

/// Rebuild the persisted part of the state described by `spec`.
///
/// Only fields with persisted data appear in the result. A nested branch with
/// nothing persisted beneath it is omitted rather than present as `{}`. A leaf
/// that fails to read or decode is logged and omitted; its siblings are
/// unaffected.
pub fn reconstruct(
    spec: &KeySpec,
    storage: &dyn StorageBackend,
    default_deserialize: &DeserializeFn,
) -> Map<String, Value> {
    reconstruct_at(spec, "", storage, default_deserialize)
}

fn reconstruct_at(
    spec: &KeySpec,
    parent: &str,
    storage: &dyn StorageBackend,
    default_deserialize: &DeserializeFn,
) -> Map<String, Value> {
    let mut out = Map::new();
    for (field, node) in spec {
        let path = join_path(parent, field);
        let restored = match node {
            KeyNode::Default => read_leaf(storage, &path, default_deserialize),
            KeyNode::Custom(codec) => {
                read_leaf(storage, &path, codec.deserialize_fn(default_deserialize))
            }
            KeyNode::Nested(child) => {
                let nested = reconstruct_at(child, &path, storage, default_deserialize);
                Ok((!nested.is_empty()).then_some(Value::Object(nested)))
            }
            KeyNode::Skip => continue,
        };
        match restored {
            Ok(Some(value)) => {
                out.insert(field.clone(), value);
            }
            Ok(None) => trace!(%path, "nothing persisted"),
            Err(e) => warn!(%path, error = %e, "skipping persisted slice"),
        }
    }
    out
}

/// Read and decode a single storage key.
///
/// An absent key and an empty stored string both yield `Ok(None)`.
pub fn read_leaf(
    storage: &dyn StorageBackend,
    key: &str,
    deserialize: &DeserializeFn,
) -> PersistResult<Option<Value>> {
    let text = match storage.get(key).map_err(|e| PersistError::storage(key, e))? {
        Some(text) if !text.is_empty() => text,
        _ => return Ok(None),
    };
    let value = deserialize(&text).map_err(|e| PersistError::Decode {
        key: key.to_string(),
        reason: format!("{e:#}"),
    })?;
    debug!(%key, "restored persisted slice");
    Ok(Some(value))
}

/// Encode `value` for storage under `key`.
pub fn encode_leaf(
    key: String,
    value: &Value,
    serialize: &SerializeFn,
) -> PersistResult<(String, String)> {
    match serialize(value) {
        Ok(text) => Ok((key, text)),
        Err(e) => Err(PersistError::Encode {
            key,
            reason: format!("{e:#}"),
        }),
    }
}

/// Walk `spec` against `state`, lazily yielding one encoded pair per leaf.
///
/// Leaves whose field is missing from `state`, and nested entries whose field
/// is not an object, produce nothing. Calling `extract` again restarts the walk.
pub fn extract<'a>(
    spec: &'a KeySpec,
    state: &'a Value,
    default_serialize: &'a SerializeFn,
) -> Extract<'a> {
    let stack = match state.as_object() {
        Some(root) => vec![Frame {
            parent: String::new(),
            entries: spec.iter(),
            state: root,
        }],
        None => Vec::new(),
    };
    Extract {
        stack,
        default_serialize,
    }
}

/// Iterator returned by [`extract`].
#[derive(Clone)]
pub struct Extract<'a> {
    stack: Vec<Frame<'a>>,
    default_serialize: &'a SerializeFn,
}

#[derive(Clone)]
struct Frame<'a> {
    parent: String,
    entries: std::slice::Iter<'a, (String, KeyNode)>,
    state: &'a Map<String, Value>,
}

impl<'a> Iterator for Extract<'a> {
    type Item = PersistResult<(String, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            let Some((field, node)) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };
            let state: &'a Map<String, Value> = frame.state;
            let Some(value) = state.get(field) else {
                continue;
            };
            let path = join_path(&frame.parent, field);
            match node {
                KeyNode::Default => {
                    return Some(encode_leaf(path, value, self.default_serialize));
                }
                KeyNode::Custom(codec) => {
                    let serialize = codec.serialize_fn(self.default_serialize);
                    return Some(encode_leaf(path, value, serialize));
                }
                KeyNode::Skip => {}
                KeyNode::Nested(child) => {
                    if let Some(inner) = value.as_object() {
                        self.stack.push(Frame {
                            parent: path,
                            entries: child.iter(),
                            state: inner,
                        });
                    }
                }
            }
        }
    }
}
