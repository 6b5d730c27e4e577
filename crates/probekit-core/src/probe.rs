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

//! Contracts of the registry's external collaborators.
//!
//! The registry itself only owns entry metadata. Measurement state lives in
//! a [`ProbeBackend`], initial entry shapes come from a
//! [`DefinitionRegistry`], and read results may be kept in a [`ValueCache`].

use crate::entry::{EntryTemplate, ProbeRef, ProbeType};
use crate::name::EntryName;
use crate::options::Options;
use crate::value::Value;
use std::fmt::Debug;
use std::time::Duration;

/// Result type of backend capability calls. Errors are opaque to the registry.
pub type ProbeResult<T> = anyhow::Result<T>;

/// The `(name, type, ref)` triple identifying an entry to its backend.
#[derive(Debug, Clone, Copy)]
pub struct ProbeContext<'a> {
    /// Name of the entry.
    pub name: &'a EntryName,
    /// Type of the entry.
    pub probe_type: &'a ProbeType,
    /// Handle the backend returned at creation, if any.
    pub probe_ref: Option<ProbeRef>,
}

/// The capability set every pluggable measurement backend implements.
pub trait ProbeBackend: Send + Sync + Debug + 'static {
    /// Creates backend state for a new entry, optionally returning a handle.
    fn create(
        &self,
        name: &EntryName,
        probe_type: &ProbeType,
        options: &Options,
    ) -> ProbeResult<Option<ProbeRef>>;

    /// Releases the state behind the entry.
    fn delete(&self, probe: ProbeContext<'_>) -> ProbeResult<()>;

    /// Reads the current value.
    fn read_value(&self, probe: ProbeContext<'_>) -> ProbeResult<Value>;

    /// Records a new measurement.
    fn update(&self, probe: ProbeContext<'_>, value: &Value) -> ProbeResult<()>;

    /// Resets the measurement to its zero state.
    fn reset(&self, probe: ProbeContext<'_>) -> ProbeResult<()>;

    /// Triggers a backend-internal refresh.
    fn sample(&self, probe: ProbeContext<'_>) -> ProbeResult<()>;

    /// Applies new options.
    fn configure(&self, probe: ProbeContext<'_>, options: &Options) -> ProbeResult<()>;
}

/// Resolves a name and type into the template a new entry starts from.
pub trait DefinitionRegistry: Send + Sync + Debug {
    /// Returns `None` when no definition matches, which aborts creation.
    fn lookup_definition(&self, name: &EntryName, probe_type: &ProbeType)
        -> Option<EntryTemplate>;
}

/// A key/value cache with per-item TTL.
///
/// Writes are conditional on an invalidation epoch. A reader takes
/// [`ValueCache::epoch`] before fetching the value it wants to store. If the
/// name is invalidated with [`ValueCache::delete`] in between, the write is
/// dropped, so a value read before a reset can never be cached after it.
pub trait ValueCache: Send + Sync + Debug {
    /// Returns the cached value, or `None` on a miss or expiry.
    fn read(&self, name: &EntryName) -> Option<Value>;

    /// The current invalidation epoch for the name. Implementations may share
    /// one epoch across all names.
    fn epoch(&self, name: &EntryName) -> u64;

    /// Stores a value that stays valid for `ttl`, unless the name was
    /// invalidated after `epoch` was taken. Returns `true` if it was stored.
    fn write(&self, name: &EntryName, value: Value, ttl: Duration, epoch: u64) -> bool;

    /// Drops any cached value for the name and moves its epoch forward.
    fn delete(&self, name: &EntryName);
}
