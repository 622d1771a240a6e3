//! Memoized overload selections, keyed by argument-shape code.

use std::sync::Arc;

use crossbind_core::{Callable, TypeHash};
use dashmap::DashMap;

/// Per-group cache of previously selected callables.
///
/// Lookups and inserts lock only one shard. Two threads resolving the same
/// shape concurrently compute the same answer, so a lost race just overwrites
/// an identical entry. Only successful selections are stored.
#[derive(Debug, Default)]
pub struct SignatureCache {
    entries: DashMap<TypeHash, Arc<Callable>>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: TypeHash) -> Option<Arc<Callable>> {
        self.entries.get(&code).map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(&self, code: TypeHash, callable: Arc<Callable>) {
        self.entries.insert(code, callable);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
