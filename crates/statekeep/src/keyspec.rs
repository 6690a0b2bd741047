//! Declarative description of which state sub-trees to persist.
//!
//! A [`KeySpec`] maps field names to [`KeyNode`]s. Each leaf is stored under
//! the dot-joined path of field names from the root (`cart`,
//! `deep.this.is.my`). An empty spec means "persist the whole state as one
//! unit" rather than "persist nothing".

use crate::codec::CodecOverride;

/// One entry of a [`KeySpec`].
#[derive(Debug, Clone)]
pub enum KeyNode {
    /// Persist this sub-tree with the default codec.
    Default,
    /// Persist this sub-tree with a per-leaf codec override.
    Custom(CodecOverride),
    /// Descend into the named field.
    Nested(KeySpec),
    /// Persist nothing for this field. Still counts as an entry, so a spec
    /// holding only skipped fields stays in keyed mode.
    Skip,
}

/// Ordered mapping of field name to [`KeyNode`].
#[derive(Debug, Clone, Default)]
pub struct KeySpec {
    entries: Vec<(String, KeyNode)>,
}

impl KeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: persist `field` with the default codec.
    pub fn leaf(self, field: impl Into<String>) -> Self {
        self.with(field, KeyNode::Default)
    }

    /// Builder method: persist `field` with a codec override.
    pub fn custom(self, field: impl Into<String>, codec: CodecOverride) -> Self {
        self.with(field, KeyNode::Custom(codec))
    }

    /// Builder method: descend into `field`.
    pub fn nested(self, field: impl Into<String>, spec: KeySpec) -> Self {
        self.with(field, KeyNode::Nested(spec))
    }

    /// Builder method: explicitly exclude `field`.
    pub fn skip(self, field: impl Into<String>) -> Self {
        self.with(field, KeyNode::Skip)
    }

    /// Builder method: set `field` to `node`, replacing an earlier entry of
    /// the same name in place.
    pub fn with(mut self, field: impl Into<String>, node: KeyNode) -> Self {
        self.insert(field, node);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, node: KeyNode) {
        let field = field.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = node,
            None => self.entries.push((field, node)),
        }
    }

    /// `true` selects whole-state mode.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, (String, KeyNode)> {
        self.entries.iter()
    }

    /// Every leaf storage key, depth-first in insertion order.
    pub fn storage_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        self.collect_keys("", &mut keys);
        keys
    }

    fn collect_keys(&self, parent: &str, keys: &mut Vec<String>) {
        for (field, node) in &self.entries {
            let path = join_path(parent, field);
            match node {
                KeyNode::Nested(spec) => spec.collect_keys(&path, keys),
                KeyNode::Default | KeyNode::Custom(_) => keys.push(path),
                KeyNode::Skip => {}
            }
        }
    }
}

impl<'a> IntoIterator for &'a KeySpec {
    type Item = &'a (String, KeyNode);
    type IntoIter = std::slice::Iter<'a, (String, KeyNode)>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Append `field` to a dot-joined `parent` path.
pub fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}
