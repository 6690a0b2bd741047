//! Persistence middleware around a state transition function.
//!
//! [`PersistMiddleware::wrap`] decorates a [`Reducer`]. The returned
//! [`PersistReducer`] restores persisted state once, at construction, and
//! supplies it whenever the host passes no state. After every transition it
//! writes the new state to storage. Storage, encode, and decode failures are
//! logged and dropped: the host always gets the wrapped reducer's result.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::codec::Codec;
use crate::config::PersistConfig;
use crate::error::{PersistError, PersistResult};
use crate::keyspec::KeySpec;
use crate::resolver::{encode_leaf, extract, read_leaf, reconstruct};
use crate::storage::StorageBackend;

/// A pure state transition: `(state, action) -> state`.
///
/// `None` means the host has no state yet; the reducer supplies its own
/// default.
pub trait Reducer<S, A> {
    fn reduce(&self, state: Option<S>, action: &A) -> S;
}

impl<S, A, F> Reducer<S, A> for F
where
    F: Fn(Option<S>, &A) -> S,
{
    fn reduce(&self, state: Option<S>, action: &A) -> S {
        self(state, action)
    }
}

/// How state maps onto storage keys. Fixed at construction.
#[derive(Debug, Clone)]
pub enum Mode {
    /// The whole state is one blob under `global_key`.
    WholeState { global_key: String },
    /// Each leaf of the spec is its own key.
    Keyed(KeySpec),
}

impl Mode {
    fn name(&self) -> &'static str {
        match self {
            Self::WholeState { .. } => "whole-state",
            Self::Keyed(_) => "keyed",
        }
    }
}

/// Mode-selected read/write engine shared by both lifecycle phases.
#[derive(Clone)]
pub struct Persister {
    storage: Arc<dyn StorageBackend>,
    codec: Codec,
    mode: Mode,
}

impl Persister {
    pub fn new(config: PersistConfig) -> Self {
        let codec = config.default_codec();
        let mode = if config.keys.is_empty() {
            Mode::WholeState {
                global_key: config.global_key,
            }
        } else {
            Mode::Keyed(config.keys)
        };
        debug!(mode = mode.name(), "persister configured");
        Self {
            storage: config.storage,
            codec,
            mode,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Every storage key this persister reads and writes.
    pub fn storage_keys(&self) -> Vec<String> {
        match &self.mode {
            Mode::WholeState { global_key } => vec![global_key.clone()],
            Mode::Keyed(spec) => spec.storage_keys(),
        }
    }

    /// Read persisted state. `None` when nothing has been persisted.
    ///
    /// In keyed mode a failing leaf is omitted rather than failing the load.
    pub fn load(&self) -> PersistResult<Option<Value>> {
        match &self.mode {
            Mode::WholeState { global_key } => {
                read_leaf(self.storage.as_ref(), global_key, &self.codec.deserialize)
            }
            Mode::Keyed(spec) => {
                let restored = reconstruct(spec, self.storage.as_ref(), &self.codec.deserialize);
                Ok((!restored.is_empty()).then_some(Value::Object(restored)))
            }
        }
    }

    /// Write `state`, returning the number of keys written.
    ///
    /// In keyed mode every key is attempted; the first failure is returned
    /// after the remaining keys have been written.
    pub fn save(&self, state: &Value) -> PersistResult<usize> {
        match &self.mode {
            Mode::WholeState { global_key } => {
                let (key, text) = encode_leaf(global_key.clone(), state, &self.codec.serialize)?;
                self.write(&key, &text)?;
                Ok(1)
            }
            Mode::Keyed(spec) => {
                let mut written = 0;
                let mut first_err = None;
                for pair in extract(spec, state, &self.codec.serialize) {
                    let outcome = pair.and_then(|(key, text)| self.write(&key, &text));
                    match outcome {
                        Ok(()) => written += 1,
                        Err(e) => {
                            warn!(key = e.key().unwrap_or_default(), error = %e, "slice not persisted");
                            first_err.get_or_insert(e);
                        }
                    }
                }
                match first_err {
                    Some(e) => Err(e),
                    None => Ok(written),
                }
            }
        }
    }

    /// Remove every key this persister owns, returning how many were removed.
    pub fn forget(&self) -> PersistResult<usize> {
        let keys = self.storage_keys();
        for key in &keys {
            self.storage
                .remove(key)
                .map_err(|e| PersistError::storage(key, e))?;
        }
        debug!(count = keys.len(), "persisted state forgotten");
        Ok(keys.len())
    }

    fn write(&self, key: &str, text: &str) -> PersistResult<()> {
        self.storage
            .set(key, text)
            .map_err(|e| PersistError::storage(key, e))?;
        debug!(%key, "state slice persisted");
        Ok(())
    }
}

/// Middleware factory: holds configuration, wraps reducers.
#[derive(Clone)]
pub struct PersistMiddleware {
    persister: Arc<Persister>,
}

impl PersistMiddleware {
    pub fn new(config: PersistConfig) -> Self {
        Self {
            persister: Arc::new(Persister::new(config)),
        }
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    /// Decorate `reducer`, restoring persisted state now.
    pub fn wrap<S, A, R>(&self, reducer: R) -> PersistReducer<S, A, R>
    where
        S: DeserializeOwned,
        R: Reducer<S, A>,
    {
        let initial_state = restore(&self.persister);
        PersistReducer {
            reducer,
            persister: Arc::clone(&self.persister),
            initial_state,
            _action: PhantomData,
        }
    }
}

fn restore<S: DeserializeOwned>(persister: &Persister) -> Option<S> {
    let restored = persister.load().and_then(|tree| {
        tree.map(serde_json::from_value::<S>)
            .transpose()
            .map_err(|e| PersistError::State(e.to_string()))
    });
    match restored {
        Ok(Some(state)) => {
            debug!(mode = persister.mode().name(), "persisted state restored");
            Some(state)
        }
        Ok(None) => {
            debug!(mode = persister.mode().name(), "no persisted state");
            None
        }
        Err(e) => {
            error!(error = %e, "failed to restore persisted state");
            None
        }
    }
}

/// A reducer that persists every state it produces.
pub struct PersistReducer<S, A, R> {
    reducer: R,
    persister: Arc<Persister>,
    initial_state: Option<S>,
    _action: PhantomData<fn(&A)>,
}

impl<S, A, R> PersistReducer<S, A, R>
where
    S: Clone + Serialize,
    R: Reducer<S, A>,
{
    /// Run one transition, persisting the result.
    ///
    /// Falls back to the restored state when `state` is `None`. The wrapped
    /// reducer's result is returned whether or not persisting succeeded.
    pub fn handle(&self, state: Option<S>, action: &A) -> S {
        let state = state.or_else(|| self.initial_state.clone());
        let next = self.reducer.reduce(state, action);
        if let Err(e) = self.persist(&next) {
            error!(error = %e, "failed to persist state");
        }
        next
    }

    fn persist(&self, state: &S) -> PersistResult<usize> {
        let tree = serde_json::to_value(state).map_err(|e| PersistError::State(e.to_string()))?;
        self.persister.save(&tree)
    }
}

impl<S, A, R> PersistReducer<S, A, R> {
    /// State restored at construction, if any.
    pub fn initial_state(&self) -> Option<&S> {
        self.initial_state.as_ref()
    }
}

impl<S, A, R> Reducer<S, A> for PersistReducer<S, A, R>
where
    S: Clone + Serialize,
    R: Reducer<S, A>,
{
    fn reduce(&self, state: Option<S>, action: &A) -> S {
        self.handle(state, action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::storage::MemoryStorage;
    use serde_json::json;

    /// Rejects writes to a single key.
    struct ReadOnlyKey {
        inner: MemoryStorage,
        locked: &'static str,
    }

    impl StorageBackend for ReadOnlyKey {
        fn get(&self, key: &str) -> StorageResult<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> StorageResult<()> {
            if key == self.locked {
                return Err(StorageError::Write(format!("{key} is read-only")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.inner.remove(key)
        }
    }

    fn keyed(storage: Arc<MemoryStorage>, keys: KeySpec) -> Persister {
        Persister::new(PersistConfig::new().shared_storage(storage).keys(keys))
    }

    #[test]
    fn empty_keys_select_whole_state_mode() {
        let persister = Persister::new(PersistConfig::new().global_key("APP"));
        assert!(matches!(persister.mode(), Mode::WholeState { global_key } if global_key == "APP"));
        assert_eq!(persister.storage_keys(), vec!["APP"]);
    }

    #[test]
    fn whole_state_save_then_load() {
        let persister = Persister::new(PersistConfig::new());
        let state = json!({"counter": 3});

        assert_eq!(persister.save(&state).unwrap(), 1);
        assert_eq!(persister.load().unwrap(), Some(state));
    }

    #[test]
    fn keyed_load_of_empty_storage_is_none() {
        let persister = keyed(Arc::new(MemoryStorage::new()), KeySpec::new().leaf("cart"));
        assert_eq!(persister.load().unwrap(), None);
    }

    #[test]
    fn keyed_save_writes_only_addressed_keys() {
        let storage = Arc::new(MemoryStorage::new());
        let persister = keyed(storage.clone(), KeySpec::new().leaf("cart"));

        let written = persister
            .save(&json!({"cart": {"cartItems": {"A": 1}}, "catalog": {}}))
            .unwrap();

        assert_eq!(written, 1);
        let snapshot = storage.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["cart"], r#"{"cartItems":{"A":1}}"#);
    }

    #[test]
    fn keyed_save_continues_past_failed_key() {
        let storage = Arc::new(ReadOnlyKey {
            inner: MemoryStorage::new(),
            locked: "a",
        });
        let persister = Persister::new(
            PersistConfig::new()
                .shared_storage(storage.clone())
                .keys(KeySpec::new().leaf("a").leaf("b")),
        );

        let err = persister.save(&json!({"a": 1, "b": 2})).unwrap_err();

        assert!(matches!(err, PersistError::Storage { ref key, .. } if key == "a"));
        assert_eq!(storage.inner.get("b").unwrap().as_deref(), Some("2"));
        assert!(storage.inner.get("a").unwrap().is_none());
    }

    #[test]
    fn forget_removes_owned_keys_only() {
        let storage = Arc::new(MemoryStorage::with_entries([
            ("cart", "{}"),
            ("catalog", "[]"),
        ]));
        let persister = keyed(storage.clone(), KeySpec::new().leaf("cart"));

        assert_eq!(persister.forget().unwrap(), 1);
        assert!(storage.get("cart").unwrap().is_none());
        assert!(storage.get("catalog").unwrap().is_some());
    }

    #[test]
    fn reducer_trait_covers_closures() {
        let reducer = |state: Option<i64>, delta: &i64| state.unwrap_or(0) + delta;
        assert_eq!(reducer.reduce(Some(2), &3), 5);
        assert_eq!(reducer.reduce(None, &3), 3);
    }

    #[test]
    fn undecodable_state_falls_back_to_none() {
        let storage = MemoryStorage::with_entries([("__STATE__", r#""not a number""#)]);
        let middleware = PersistMiddleware::new(PersistConfig::new().storage(storage));

        let wrapped = middleware.wrap(|state: Option<i64>, _: &()| state.unwrap_or(0));

        assert_eq!(wrapped.initial_state(), None);
        assert_eq!(wrapped.handle(None, &()), 0);
    }
}
