//! Middleware configuration.
//!
//! [`PersistConfig`] is the programmatic form with the five recognised
//! options. [`PersistSettings`] is its TOML file form; custom codecs cannot
//! be expressed there, so every leaf it describes uses the default codec.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{Codec, DeserializeFn, SerializeFn};
use crate::error::{PersistError, PersistResult};
use crate::keyspec::{join_path, KeySpec};
use crate::storage::{MemoryStorage, RedbStorage, StorageBackend};

/// Storage key used in whole-state mode unless configured otherwise.
pub const DEFAULT_GLOBAL_KEY: &str = "__STATE__";

/// Configuration for a [`PersistMiddleware`](crate::middleware::PersistMiddleware).
#[derive(Clone)]
pub struct PersistConfig {
    pub default_serialize: SerializeFn,
    pub default_deserialize: DeserializeFn,
    /// Storage key for whole-state mode.
    pub global_key: String,
    pub storage: Arc<dyn StorageBackend>,
    /// Slices to persist. Empty selects whole-state mode.
    pub keys: KeySpec,
}

impl Default for PersistConfig {
    fn default() -> Self {
        let codec = Codec::json();
        Self {
            default_serialize: codec.serialize,
            default_deserialize: codec.deserialize,
            global_key: DEFAULT_GLOBAL_KEY.to_string(),
            storage: Arc::new(MemoryStorage::new()),
            keys: KeySpec::new(),
        }
    }
}

impl PersistConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: replace the default encoder.
    pub fn default_serialize<S>(self, serialize: S) -> Self
    where
        S: Fn(&Value) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            default_serialize: Arc::new(serialize),
            ..self
        }
    }

    /// Builder method: replace the default decoder.
    pub fn default_deserialize<D>(self, deserialize: D) -> Self
    where
        D: Fn(&str) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            default_deserialize: Arc::new(deserialize),
            ..self
        }
    }

    /// Builder method: set the whole-state storage key.
    pub fn global_key(self, global_key: impl Into<String>) -> Self {
        Self {
            global_key: global_key.into(),
            ..self
        }
    }

    /// Builder method: set the storage backend.
    pub fn storage(self, storage: impl StorageBackend + 'static) -> Self {
        self.shared_storage(Arc::new(storage))
    }

    /// Builder method: set a storage backend that is also held elsewhere.
    pub fn shared_storage(self, storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage, ..self }
    }

    /// Builder method: set the slices to persist.
    pub fn keys(self, keys: KeySpec) -> Self {
        Self { keys, ..self }
    }

    /// The default codec as a pair.
    pub fn default_codec(&self) -> Codec {
        Codec {
            serialize: self.default_serialize.clone(),
            deserialize: self.default_deserialize.clone(),
        }
    }
}

impl fmt::Debug for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("global_key", &self.global_key)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

/// TOML representation of a [`PersistConfig`].
///
/// ```toml
/// global_key = "__STATE__"
///
/// [storage]
/// path = "state.redb"
///
/// [keys]
/// cart = true
///
/// [keys.deep.this.is]
/// my = true
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistSettings {
    pub global_key: Option<String>,
    pub storage: Option<StorageSettings>,
    /// `true` marks a leaf, `false` persists nothing, a table nests. Any
    /// entry at all selects keyed mode.
    #[serde(default)]
    pub keys: toml::Table,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// redb database file. In-memory storage when absent.
    pub path: Option<PathBuf>,
}

impl PersistSettings {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn global_key(&self) -> &str {
        self.global_key.as_deref().unwrap_or(DEFAULT_GLOBAL_KEY)
    }

    /// Convert the `[keys]` table into a [`KeySpec`].
    pub fn key_spec(&self) -> PersistResult<KeySpec> {
        spec_from_table(&self.keys, "")
    }

    /// Configured redb database file, if any.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage.as_ref().and_then(|s| s.path.as_deref())
    }

    /// Open the configured storage backend.
    pub fn open_storage(&self) -> PersistResult<Arc<dyn StorageBackend>> {
        match self.storage_path() {
            Some(path) => {
                let storage = RedbStorage::open(path)
                    .map_err(|e| PersistError::storage(&path.display().to_string(), e))?;
                Ok(Arc::new(storage))
            }
            None => Ok(Arc::new(MemoryStorage::new())),
        }
    }

    /// Build a [`PersistConfig`] with the default JSON codec.
    pub fn into_config(self) -> PersistResult<PersistConfig> {
        let keys = self.key_spec()?;
        let storage = self.open_storage()?;
        Ok(PersistConfig::default()
            .global_key(self.global_key())
            .shared_storage(storage)
            .keys(keys))
    }
}

fn spec_from_table(table: &toml::Table, parent: &str) -> PersistResult<KeySpec> {
    let mut spec = KeySpec::new();
    for (field, value) in table {
        let path = join_path(parent, field);
        match value {
            toml::Value::Boolean(true) => spec = spec.leaf(field.as_str()),
            toml::Value::Boolean(false) => spec = spec.skip(field.as_str()),
            toml::Value::Table(child) => {
                spec = spec.nested(field.as_str(), spec_from_table(child, &path)?)
            }
            other => {
                return Err(PersistError::Config(format!(
                    "`keys.{path}` must be a boolean or a table, found {}",
                    other.type_str()
                )));
            }
        }
    }
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_whole_state_mode() {
        let config = PersistConfig::default();
        assert_eq!(config.global_key, "__STATE__");
        assert!(config.keys.is_empty());
    }

    #[test]
    fn builder_methods_chain() {
        let config = PersistConfig::new()
            .global_key("DONKEY")
            .keys(KeySpec::new().leaf("cart"))
            .default_serialize(|_| Ok("x".to_string()));

        assert_eq!(config.global_key, "DONKEY");
        assert_eq!(config.keys.storage_keys(), vec!["cart"]);
        assert_eq!((config.default_serialize)(&Value::Null).unwrap(), "x");
    }

    #[test]
    fn parse_minimal() {
        let settings = PersistSettings::from_toml_str("").unwrap();
        assert_eq!(settings.global_key(), DEFAULT_GLOBAL_KEY);
        assert!(settings.key_spec().unwrap().is_empty());
    }

    #[test]
    fn parse_nested_keys() {
        let settings = PersistSettings::from_toml_str(
            r#"
global_key = "APP"

[keys]
cart = true
catalog = false

[keys.deep.this.is]
my = true
"#,
        )
        .unwrap();

        let keys = settings.key_spec().unwrap().storage_keys();
        assert_eq!(keys, vec!["cart", "deep.this.is.my"]);
        assert_eq!(settings.global_key(), "APP");
    }

    #[test]
    fn keys_keep_file_order() {
        let settings =
            PersistSettings::from_toml_str("[keys]\nzeta = true\nalpha = true\nmid = true\n")
                .unwrap();
        assert_eq!(
            settings.key_spec().unwrap().storage_keys(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn all_false_keys_stay_in_keyed_mode() {
        let storage = Arc::new(MemoryStorage::new());
        let settings = PersistSettings::from_toml_str("[keys]\ncart = false\n").unwrap();
        let config = settings.into_config().unwrap().shared_storage(storage.clone());
        let persister = crate::middleware::Persister::new(config);

        assert!(matches!(persister.mode(), crate::middleware::Mode::Keyed(_)));
        let written = persister
            .save(&serde_json::json!({"cart": {"A": 1}, "catalog": {"secret": 1}}))
            .unwrap();
        assert_eq!(written, 0);
        assert!(storage.is_empty());
    }

    #[test]
    fn storage_path_is_optional() {
        assert!(PersistSettings::default().storage_path().is_none());
        let settings =
            PersistSettings::from_toml_str("[storage]\npath = \"state.redb\"\n").unwrap();
        assert_eq!(settings.storage_path(), Some(Path::new("state.redb")));
    }

    #[test]
    fn reject_non_boolean_leaf() {
        let settings = PersistSettings::from_toml_str("[keys.user]\nname = 3\n").unwrap();
        let err = settings.key_spec().unwrap_err();
        assert!(err.to_string().contains("keys.user.name"));
    }

    #[test]
    fn into_config_uses_redb_path() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PersistSettings {
            storage: Some(StorageSettings {
                path: Some(dir.path().join("state.redb")),
            }),
            ..Default::default()
        };

        let config = settings.into_config().unwrap();
        config.storage.set("k", "v").unwrap();
        assert_eq!(config.storage.get("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn toml_round_trip_keeps_keys() {
        let settings = PersistSettings::from_toml_str("[keys]\ncart = true\n").unwrap();
        let text = settings.to_toml_string().unwrap();
        assert!(text.contains("cart = true"));
    }
}
