//! statekeep — selective persistence for single-tree application state.
//!
//! Wraps a state transition function (a [`Reducer`]) so that persisted state
//! is restored once at startup and every new state is written back to a
//! pluggable [`StorageBackend`] after each transition.
//!
//! # Modes
//!
//! With an empty [`KeySpec`] the whole state is stored as one JSON blob under
//! a global key. Otherwise each leaf of the spec is stored under its
//! dot-joined field path (`cart`, `deep.this.is.my`) and reassembled into the
//! state's nested shape on restore.
//!
//! # Failure containment
//!
//! Storage, encode, and decode failures never reach the host. They are logged
//! through `tracing` and the middleware degrades to in-memory behaviour.
//!
//! ```
//! use statekeep::{KeySpec, PersistConfig, PersistMiddleware};
//!
//! let middleware = PersistMiddleware::new(PersistConfig::new().keys(KeySpec::new().leaf("count")));
//! let reducer = middleware.wrap(|state: Option<serde_json::Value>, delta: &i64| {
//!     let count = state
//!         .as_ref()
//!         .and_then(|s| s["count"].as_i64())
//!         .unwrap_or(0);
//!     serde_json::json!({ "count": count + delta })
//! });
//! let state = reducer.handle(None, &2);
//! assert_eq!(state["count"], 2);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod keyspec;
pub mod middleware;
pub mod resolver;
pub mod storage;

pub use codec::{Codec, CodecOverride, DeserializeFn, SerializeFn};
pub use config::{PersistConfig, PersistSettings, StorageSettings, DEFAULT_GLOBAL_KEY};
pub use error::{PersistError, PersistResult, StorageError, StorageResult};
pub use keyspec::{KeyNode, KeySpec};
pub use middleware::{Mode, PersistMiddleware, PersistReducer, Persister, Reducer};
pub use storage::{MemoryStorage, RedbStorage, StorageBackend};
