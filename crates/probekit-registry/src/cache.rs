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

//! Read-through caching of backend values.

use probekit_core::{Entry, EntryName, RegistryResult, Value, ValueCache};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedValue {
    value: Value,
    expires_at: Instant,
}

impl CachedValue {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process [`ValueCache`] with per-item TTL.
///
/// Expired items are treated as misses on read and dropped by
/// [`TtlCache::purge_expired`] or the next write to the same name.
///
/// One invalidation epoch is shared by every name. A `delete` of any name
/// therefore rejects all writes that were in flight, which costs at most one
/// extra backend read per rejected write.
#[derive(Debug, Default)]
pub struct TtlCache {
    items: RwLock<HashMap<EntryName, CachedValue>>,
    // Only moved under the `items` write lock.
    epoch: AtomicU64,
}

impl TtlCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every expired item, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Ok(mut items) = self.items.write() else {
            log::warn!("TtlCache: failed to acquire write lock for purge");
            return 0;
        };
        let now = Instant::now();
        let before = items.len();
        items.retain(|_, item| !item.is_expired(now));
        before - items.len()
    }

    /// The number of stored items, expired or not.
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops everything.
    pub fn clear(&self) {
        if let Ok(mut items) = self.items.write() {
            items.clear();
        }
    }
}

impl ValueCache for TtlCache {
    fn read(&self, name: &EntryName) -> Option<Value> {
        let items = self.items.read().ok()?;
        let item = items.get(name)?;
        if item.is_expired(Instant::now()) {
            None
        } else {
            Some(item.value.clone())
        }
    }

    fn epoch(&self, _name: &EntryName) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn write(&self, name: &EntryName, value: Value, ttl: Duration, epoch: u64) -> bool {
        let Ok(mut items) = self.items.write() else {
            log::warn!("TtlCache: failed to cache value for {}", name);
            return false;
        };
        if self.epoch.load(Ordering::Acquire) != epoch {
            log::trace!("dropping stale value for {}", name);
            return false;
        }
        items.insert(
            name.clone(),
            CachedValue {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        true
    }

    fn delete(&self, name: &EntryName) {
        match self.items.write() {
            Ok(mut items) => {
                items.remove(name);
                self.epoch.fetch_add(1, Ordering::AcqRel);
            }
            Err(_) => log::warn!("TtlCache: failed to invalidate {}", name),
        }
    }
}

/// Reads an entry's value through the cache.
///
/// Entries with a zero TTL never touch the cache. Otherwise a hit is returned
/// without calling `read`, and a miss calls it and stores the result for the
/// entry's TTL. `Unavailable` results are not stored, and neither are results
/// whose name was invalidated while `read` ran.
pub fn read_through<F>(cache: &dyn ValueCache, entry: &Entry, read: F) -> RegistryResult<Value>
where
    F: FnOnce() -> RegistryResult<Value>,
{
    if entry.cache_ttl.is_zero() {
        return read();
    }
    if let Some(value) = cache.read(&entry.name) {
        log::trace!("cache hit for {}", entry.name);
        return Ok(value);
    }
    log::trace!("cache miss for {}", entry.name);
    let epoch = cache.epoch(&entry.name);
    let value = read()?;
    if !value.is_unavailable() {
        cache.write(&entry.name, value.clone(), entry.cache_ttl, epoch);
    }
    Ok(value)
}
