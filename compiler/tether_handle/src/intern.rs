//! Weak intern tables for handle payloads.
//!
//! Equal payloads created independently share one allocation while any
//! handle holds it. The table never keeps a payload alive by itself: entries
//! hold `Weak` references and dead ones are swept every few insertions.
//!
//! Reads go through `DashMap` shard read locks; inserts take one shard's
//! write lock, so handle creation from parallel tasks does not serialise.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

use crate::signature::Signature;
use crate::type_handle::TypeGraph;

/// Insertions between sweeps of dead entries.
const DEFAULT_PURGE_THRESHOLD: usize = 1024;

/// Concurrent interner holding weak references to its values.
pub struct WeakInterner<T> {
    map: DashMap<T, Weak<T>, FxBuildHasher>,
    inserts: AtomicUsize,
    purge_threshold: usize,
}

impl<T> WeakInterner<T>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        WeakInterner::with_purge_threshold(DEFAULT_PURGE_THRESHOLD)
    }

    /// Sweep dead entries every `threshold` insertions (at least one).
    pub fn with_purge_threshold(threshold: usize) -> Self {
        WeakInterner {
            map: DashMap::with_hasher(FxBuildHasher),
            inserts: AtomicUsize::new(0),
            purge_threshold: threshold.max(1),
        }
    }

    /// Shared allocation equal to `value`.
    pub fn intern(&self, value: T) -> Arc<T> {
        // Fast path: a live entry under a read lock.
        if let Some(live) = self.map.get(&value).and_then(|weak| weak.upgrade()) {
            tracing::trace!("intern hit");
            return live;
        }

        let interned = match self.map.entry(value) {
            Entry::Occupied(mut entry) => {
                if let Some(live) = entry.get().upgrade() {
                    return live;
                }
                let fresh = Arc::new(entry.key().clone());
                entry.insert(Arc::downgrade(&fresh));
                fresh
            }
            Entry::Vacant(entry) => {
                let fresh = Arc::new(entry.key().clone());
                entry.insert(Arc::downgrade(&fresh));
                fresh
            }
        };

        // The entry guard is gone; sweeping takes every shard lock.
        let count = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if count % self.purge_threshold == 0 {
            self.purge();
        }
        interned
    }

    /// Drop entries whose values are no longer referenced.
    pub fn purge(&self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, weak| weak.strong_count() > 0);
        let removed = before.saturating_sub(self.map.len());
        tracing::trace!(removed, "purged intern table");
        removed
    }

    /// Entries currently in the table, live or not yet swept.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries whose values are still referenced.
    pub fn live(&self) -> usize {
        self.map.iter().filter(|entry| entry.value().strong_count() > 0).count()
    }
}

impl<T> Default for WeakInterner<T>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        WeakInterner::new()
    }
}

impl<T: Eq + Hash> fmt::Debug for WeakInterner<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakInterner")
            .field("entries", &self.map.len())
            .field("purge_threshold", &self.purge_threshold)
            .finish()
    }
}

/// Intern service shared by the handles of one session.
///
/// Pass the same pool to every `create` call whose handles should share
/// storage. Handles from different pools still compare equal by value.
#[derive(Debug, Default)]
pub struct InternPool {
    signatures: WeakInterner<Signature>,
    types: WeakInterner<TypeGraph>,
}

impl InternPool {
    pub fn new() -> Self {
        InternPool::default()
    }

    pub fn with_purge_threshold(threshold: usize) -> Self {
        InternPool {
            signatures: WeakInterner::with_purge_threshold(threshold),
            types: WeakInterner::with_purge_threshold(threshold),
        }
    }

    pub(crate) fn signature(&self, signature: Signature) -> Arc<Signature> {
        self.signatures.intern(signature)
    }

    pub(crate) fn type_graph(&self, graph: TypeGraph) -> Arc<TypeGraph> {
        self.types.intern(graph)
    }

    pub fn signatures(&self) -> &WeakInterner<Signature> {
        &self.signatures
    }

    pub fn types(&self) -> &WeakInterner<TypeGraph> {
        &self.types
    }

    /// Sweep both tables now.
    pub fn purge(&self) -> usize {
        self.signatures.purge() + self.types.purge()
    }
}
