//! Shared fixtures: a minimal single-tree store and a storage backend that
//! always fails.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use statekeep::{Reducer, StorageBackend, StorageError, StorageResult};

/// Dispatches actions through a reducer, holding the current state.
///
/// Like a host store, it computes its first state by reducing an init
/// action with no prior state.
pub struct Store<S, A, R> {
    reducer: R,
    state: S,
    _action: std::marker::PhantomData<fn(&A)>,
}

impl<S: Clone, A, R: Reducer<S, A>> Store<S, A, R> {
    pub fn new(reducer: R, init: &A) -> Self {
        let state = reducer.reduce(None, init);
        Self {
            reducer,
            state,
            _action: std::marker::PhantomData,
        }
    }

    pub fn dispatch(&mut self, action: &A) -> &S {
        let next = self.reducer.reduce(Some(self.state.clone()), action);
        self.state = next;
        &self.state
    }

    pub fn state(&self) -> &S {
        &self.state
    }
}

/// Backend whose every operation fails.
#[derive(Debug, Default)]
pub struct FailingStorage {
    pub calls: AtomicUsize,
}

impl FailingStorage {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, op: &str) -> StorageResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::Transaction(format!("{op}: storage unavailable")))
    }
}

impl StorageBackend for FailingStorage {
    fn get(&self, _key: &str) -> StorageResult<Option<String>> {
        self.fail("get")
    }

    fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
        self.fail("set")
    }

    fn remove(&self, _key: &str) -> StorageResult<()> {
        self.fail("remove")
    }
}

/// Parse a stored JSON string, panicking with context on failure.
pub fn parse(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap_or_else(|e| panic!("stored value {text:?} is not JSON: {e}"))
}
