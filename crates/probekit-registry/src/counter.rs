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

//! The native counter, served straight from the shard store.
//!
//! No backend is ever called for these entries and their values are never
//! cached: an increment touches one shard, a read sums all of them.

use crate::storage::{FieldUpdate, ShardStore};
use probekit_core::{
    current_timestamp_ms, Entry, EntryName, RegistryError, RegistryResult, Value, ValueCache,
};

/// Inserts the counter with a zero cell on every shard.
///
/// Returns the entry already registered under the name, if any, in which case
/// nothing was written.
pub fn create(store: &ShardStore, mut entry: Entry) -> RegistryResult<Option<Entry>> {
    entry.value = 0;
    entry.probe_ref = None;
    store.insert_new(entry)
}

/// Adds an integer delta on the calling thread's shard.
pub fn update(store: &ShardStore, name: &EntryName, value: &Value) -> RegistryResult<()> {
    let delta = value.as_i64().ok_or_else(|| RegistryError::IllegalValue {
        name: name.clone(),
        reason: format!("counters only accept integers, got {value:?}"),
    })?;
    store.atomic_increment(name, delta)?;
    Ok(())
}

/// Sums the partial counts of all shards.
pub fn read_value(store: &ShardStore, name: &EntryName) -> RegistryResult<Value> {
    let copies = store.read_all(name)?;
    if copies.is_empty() {
        return Err(RegistryError::NotFound(name.clone()));
    }
    let total = copies
        .iter()
        .fold(0i64, |acc, copy| acc.wrapping_add(copy.value));
    Ok(Value::Integer(total))
}

/// Zeroes every shard and drops any value cached under the name by a
/// previous, non-counter entry of the same name.
pub fn reset(store: &ShardStore, cache: &dyn ValueCache, name: &EntryName) -> RegistryResult<()> {
    store.update_fields(
        name,
        &[
            FieldUpdate::Value(0),
            FieldUpdate::Timestamp(current_timestamp_ms()),
        ],
    )?;
    cache.delete(name);
    Ok(())
}

/// Removes the counter from every shard.
pub fn delete(store: &ShardStore, name: &EntryName) -> RegistryResult<()> {
    if store.remove_all(name)? {
        Ok(())
    } else {
        Err(RegistryError::NotFound(name.clone()))
    }
}
