// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The replicated shard store.

use probekit_core::{
    Entry, EntryName, EntryStatus, Options, ProbeRef, RegistryError, RegistryResult,
};
use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Shard every metadata read and every query is served from.
pub const PRIMARY_SHARD: usize = 0;

static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static SLOT: usize = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
}

/// The concurrency slot of the calling thread, assigned on first use.
#[inline]
pub fn current_slot() -> usize {
    SLOT.with(|slot| *slot)
}

/// A single field-level change broadcast to every shard.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Replace the status.
    Status(EntryStatus),
    /// Replace the whole option set.
    Options(Options),
    /// Replace the cache TTL.
    CacheTtl(Duration),
    /// Replace the last-mutation timestamp.
    Timestamp(u64),
    /// Replace the backend handle.
    ProbeRef(Option<ProbeRef>),
    /// Overwrite the shard-local counter cell.
    Value(i64),
}

/// One row of a shard. The counter cell lives outside the metadata so that
/// increments only need the shard's read lock.
#[derive(Debug)]
struct Row {
    meta: Entry,
    value: AtomicI64,
}

impl Row {
    fn new(entry: Entry) -> Self {
        let value = AtomicI64::new(entry.value);
        Self { meta: entry, value }
    }

    fn snapshot(&self) -> Entry {
        let mut entry = self.meta.clone();
        entry.value = self.value.load(Ordering::Acquire);
        entry
    }

    fn apply(&mut self, update: &FieldUpdate) {
        match update {
            FieldUpdate::Status(status) => self.meta.status = *status,
            FieldUpdate::Options(options) => self.meta.options = options.clone(),
            FieldUpdate::CacheTtl(ttl) => self.meta.cache_ttl = *ttl,
            FieldUpdate::Timestamp(ts) => self.meta.timestamp = *ts,
            FieldUpdate::ProbeRef(probe_ref) => self.meta.probe_ref = *probe_ref,
            FieldUpdate::Value(v) => self.value.store(*v, Ordering::Release),
        }
    }
}

#[derive(Debug, Default)]
struct Shard {
    rows: RwLock<HashMap<EntryName, Row>>,
}

/// Entry metadata replicated over a fixed set of identical shards.
///
/// Every shard holds the same metadata for every entry. The only field that
/// diverges is the counter cell: increments land on the caller's own shard and
/// the observable value is the sum of all shards.
#[derive(Debug)]
pub struct ShardStore {
    shards: Vec<Shard>,
}

impl ShardStore {
    /// Creates a store with `count` shards (at least one).
    pub fn new(count: usize) -> Self {
        let count = count.max(1);
        let shards = (0..count).map(|_| Shard::default()).collect();
        log::info!("ShardStore initialized with {} shards", count);
        Self { shards }
    }

    /// Creates a store with one shard per available hardware thread.
    pub fn with_available_parallelism() -> Self {
        Self::new(default_shard_count())
    }

    /// The number of shards, fixed for the lifetime of the store.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the shard the calling thread increments.
    #[inline]
    pub fn local_shard(&self) -> usize {
        current_slot() % self.shards.len()
    }

    /// Writes the full entry to every shard, replacing any existing row.
    pub fn insert(&self, entry: Entry) -> RegistryResult<()> {
        for shard in &self.shards {
            let mut rows = shard.rows.write().map_err(|_| write_lock_error())?;
            rows.insert(entry.name.clone(), Row::new(entry.clone()));
        }
        Ok(())
    }

    /// Writes the entry to every shard unless the name is already registered.
    ///
    /// Returns the registered entry when there is one, and writes nothing in
    /// that case. The primary shard stays write-locked from the check until
    /// every replica holds the row, so concurrent calls for one name cannot
    /// both insert. Replicas are written before the primary: a failure part
    /// way leaves the name invisible to lookups.
    pub fn insert_new(&self, entry: Entry) -> RegistryResult<Option<Entry>> {
        let mut primary = self.shards[PRIMARY_SHARD]
            .rows
            .write()
            .map_err(|_| write_lock_error())?;
        if let Some(existing) = primary.get(&entry.name) {
            return Ok(Some(existing.snapshot()));
        }
        for (index, shard) in self.shards.iter().enumerate() {
            if index == PRIMARY_SHARD {
                continue;
            }
            let mut rows = shard.rows.write().map_err(|_| write_lock_error())?;
            rows.insert(entry.name.clone(), Row::new(entry.clone()));
        }
        primary.insert(entry.name.clone(), Row::new(entry));
        Ok(None)
    }

    /// Applies the same field updates to the entry on every shard.
    pub fn update_fields(&self, name: &EntryName, updates: &[FieldUpdate]) -> RegistryResult<()> {
        if !self.contains(name)? {
            return Err(RegistryError::NotFound(name.clone()));
        }
        for shard in &self.shards {
            let mut rows = shard.rows.write().map_err(|_| write_lock_error())?;
            // A concurrent delete may already have removed the row here.
            if let Some(row) = rows.get_mut(name) {
                for update in updates {
                    row.apply(update);
                }
            }
        }
        Ok(())
    }

    /// Adds `delta` to the counter cell of the calling thread's shard only.
    ///
    /// Returns the new partial value of that shard.
    pub fn atomic_increment(&self, name: &EntryName, delta: i64) -> RegistryResult<i64> {
        let shard = &self.shards[self.local_shard()];
        let rows = shard.rows.read().map_err(|_| read_lock_error())?;
        let row = rows
            .get(name)
            .ok_or_else(|| RegistryError::NotFound(name.clone()))?;
        Ok(row.value.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta))
    }

    /// Reads the entry from the primary shard.
    pub fn read_one(&self, name: &EntryName) -> RegistryResult<Option<Entry>> {
        let rows = self.shards[PRIMARY_SHARD]
            .rows
            .read()
            .map_err(|_| read_lock_error())?;
        Ok(rows.get(name).map(Row::snapshot))
    }

    /// Reads every shard's copy of the entry. Shards without the row are skipped.
    pub fn read_all(&self, name: &EntryName) -> RegistryResult<Vec<Entry>> {
        let mut copies = Vec::with_capacity(self.shards.len());
        for shard in &self.shards {
            let rows = shard.rows.read().map_err(|_| read_lock_error())?;
            if let Some(row) = rows.get(name) {
                copies.push(row.snapshot());
            }
        }
        Ok(copies)
    }

    /// Deletes the entry from every shard. Returns `true` if the primary had it.
    pub fn remove_all(&self, name: &EntryName) -> RegistryResult<bool> {
        let mut removed = false;
        for (index, shard) in self.shards.iter().enumerate() {
            let mut rows = shard.rows.write().map_err(|_| write_lock_error())?;
            let existed = rows.remove(name).is_some();
            if index == PRIMARY_SHARD {
                removed = existed;
            }
        }
        Ok(removed)
    }

    /// Returns `true` if the primary shard holds the entry.
    pub fn contains(&self, name: &EntryName) -> RegistryResult<bool> {
        let rows = self.shards[PRIMARY_SHARD]
            .rows
            .read()
            .map_err(|_| read_lock_error())?;
        Ok(rows.contains_key(name))
    }

    /// Visits the metadata of every entry on the primary shard.
    ///
    /// The counter cell of the visited entries is not loaded. The shard stays
    /// read-locked for the whole scan, so the visitor must not write to the store.
    pub fn scan<F>(&self, mut visit: F) -> RegistryResult<()>
    where
        F: FnMut(&Entry) -> ControlFlow<()>,
    {
        let rows = self.shards[PRIMARY_SHARD]
            .rows
            .read()
            .map_err(|_| read_lock_error())?;
        for row in rows.values() {
            if visit(&row.meta).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// The number of entries. A poisoned primary shard is logged and counts as empty.
    pub fn len(&self) -> usize {
        match self.shards[PRIMARY_SHARD].rows.read() {
            Ok(rows) => rows.len(),
            Err(_) => {
                log::warn!("ShardStore: failed to acquire read lock to count entries");
                0
            }
        }
    }

    /// Returns `true` if the store holds no entry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
impl ShardStore {
    /// Poisons the primary shard's lock by panicking while holding it.
    pub(crate) fn poison_primary(&self) {
        let shard = &self.shards[PRIMARY_SHARD];
        std::thread::scope(|s| {
            let holder = s.spawn(|| {
                let _rows = shard.rows.write();
                panic!("poisoning the primary shard");
            });
            assert!(holder.join().is_err());
        });
    }
}

impl Default for ShardStore {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// One shard per hardware thread, falling back to a single shard.
pub fn default_shard_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn read_lock_error() -> RegistryError {
    RegistryError::Storage("Failed to acquire read lock".to_string())
}

fn write_lock_error() -> RegistryError {
    RegistryError::Storage("Failed to acquire write lock".to_string())
}
