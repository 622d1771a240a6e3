//! Identity cache from native instances to their managed proxies.
//!
//! Entries are keyed by native identity and hold both sides weakly, so the
//! cache never keeps a native object or its proxy alive. Dead entries are
//! dropped by [`ObjectProxyCache::sweep`], which also runs every
//! [`SWEEP_INTERVAL`] inserts.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbind_core::{NativeObject, ProxyInstance, WeakNativeObject, WeakProxyInstance};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

/// Inserts between automatic sweeps.
pub const SWEEP_INTERVAL: usize = 1024;

/// How a wrap consults the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Always allocate a fresh proxy.
    Bypass,
    /// Lookup then insert. Concurrent first wraps may produce distinct proxies.
    Relaxed,
    /// Atomic get-or-insert; every wrap of a live instance yields one proxy.
    Atomic,
}

struct CacheEntry {
    native: WeakNativeObject,
    proxy: WeakProxyInstance,
}

impl CacheEntry {
    fn new(object: &NativeObject, proxy: &ProxyInstance) -> Self {
        Self {
            native: object.downgrade(),
            proxy: proxy.downgrade(),
        }
    }

    /// The cached proxy, if it still stands for `object`.
    fn live_for(&self, object: &NativeObject) -> Option<ProxyInstance> {
        let native = self.native.upgrade()?;
        if !native.same(object) {
            return None;
        }
        self.proxy.upgrade()
    }

    fn is_dead(&self) -> bool {
        !self.native.is_alive() || self.proxy.upgrade().is_none()
    }
}

#[derive(Default)]
pub struct ObjectProxyCache {
    entries: DashMap<usize, CacheEntry>,
    inserts: AtomicUsize,
}

impl ObjectProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached proxy for `object`, if any.
    pub fn get(&self, object: &NativeObject) -> Option<ProxyInstance> {
        self.entries.get(&object.identity())?.live_for(object)
    }

    /// Proxy for `object`, allocating one with `alloc` when none is cached.
    ///
    /// In atomic mode `alloc` runs while the entry's shard is locked and must
    /// not wrap objects through this cache.
    pub fn wrap_with(
        &self,
        object: &NativeObject,
        mode: CacheMode,
        alloc: impl FnOnce() -> ProxyInstance,
    ) -> ProxyInstance {
        match mode {
            CacheMode::Bypass => alloc(),
            CacheMode::Relaxed => {
                if let Some(proxy) = self.get(object) {
                    return proxy;
                }
                let proxy = alloc();
                self.entries
                    .insert(object.identity(), CacheEntry::new(object, &proxy));
                self.after_insert();
                proxy
            }
            CacheMode::Atomic => {
                let proxy = match self.entries.entry(object.identity()) {
                    Entry::Occupied(mut slot) => {
                        if let Some(proxy) = slot.get().live_for(object) {
                            return proxy;
                        }
                        let proxy = alloc();
                        slot.insert(CacheEntry::new(object, &proxy));
                        proxy
                    }
                    Entry::Vacant(slot) => {
                        let proxy = alloc();
                        slot.insert(CacheEntry::new(object, &proxy));
                        proxy
                    }
                };
                self.after_insert();
                proxy
            }
        }
    }

    /// Drop entries whose native object or proxy is gone. Returns how many.
    pub fn sweep(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_dead());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            trace!(removed, remaining = self.entries.len(), "swept proxy cache");
        }
        removed
    }

    /// Number of entries, dead ones included until the next sweep.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn after_insert(&self) {
        if self.inserts.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            self.sweep();
        }
    }
}

impl std::fmt::Debug for ObjectProxyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectProxyCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
