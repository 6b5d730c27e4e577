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

//! The public face of the registry.
//!
//! [`ProbeRegistry`] resolves and validates every request, then either takes
//! the counter fast path or goes through the cache and the backend table.
//! All metadata changes go through the shard store.

use crate::cache::{read_through, TtlCache};
use crate::config::RegistryConfig;
use crate::counter;
use crate::definitions::StaticDefinitions;
use crate::dispatch::BackendTable;
use crate::info::{EntryInfo, InfoField, InfoValue};
use crate::query::{self, EntryTriple, QueryPattern, SegmentPattern, Term};
use crate::storage::{FieldUpdate, ShardStore};
use probekit_core::{
    current_timestamp_ms, DefinitionRegistry, Entry, EntryName, EntryStatus, Options,
    ProbeBackend, ProbeType, RegistryError, RegistryResult, Value, ValueCache, CACHE_KEY,
    STATUS_KEY,
};
use std::sync::Arc;
use std::time::Duration;

/// The options the registry interprets itself. Every other key is only
/// stored and handed to the backend.
#[derive(Debug, Default, PartialEq)]
struct LocalOptions {
    cache_ttl: Option<Duration>,
    status: Option<EntryStatus>,
}

impl LocalOptions {
    fn parse(options: &Options) -> RegistryResult<Self> {
        let cache_ttl = options
            .get(CACHE_KEY)
            .map(|v| {
                v.as_u64().map(Duration::from_millis).ok_or_else(|| {
                    RegistryError::illegal_option(
                        CACHE_KEY,
                        format!("expected a non-negative number of milliseconds, got {v}"),
                    )
                })
            })
            .transpose()?;
        let status = options
            .get(STATUS_KEY)
            .map(|v| {
                v.as_str()
                    .ok_or_else(|| format!("expected a string, got {v}"))
                    .and_then(str::parse::<EntryStatus>)
                    .map_err(|reason| RegistryError::illegal_option(STATUS_KEY, reason))
            })
            .transpose()?;
        Ok(Self { cache_ttl, status })
    }
}

/// A concurrent catalogue of named probes.
///
/// # Example
///
/// ```
/// use probekit_core::{EntryName, Options, Value};
/// use probekit_registry::ProbeRegistry;
///
/// let registry = ProbeRegistry::with_shard_count(4);
/// let name = EntryName::from(["http", "requests"]);
///
/// registry.create(name.clone(), "counter", Options::new()).unwrap();
/// registry.update(&name, &Value::Integer(3)).unwrap();
/// assert_eq!(registry.read_value(&name).unwrap(), Value::Integer(3));
/// ```
#[derive(Debug)]
pub struct ProbeRegistry {
    store: ShardStore,
    backends: BackendTable,
    definitions: Arc<dyn DefinitionRegistry>,
    cache: Arc<dyn ValueCache>,
}

impl ProbeRegistry {
    /// Creates a registry with one shard per available core, the built-in
    /// definitions and an in-process cache.
    pub fn new() -> Self {
        Self::from_store(ShardStore::with_available_parallelism())
    }

    /// Creates a registry with a fixed number of shards.
    pub fn with_shard_count(shard_count: usize) -> Self {
        Self::from_store(ShardStore::new(shard_count))
    }

    /// Builds a registry from its configuration. Backends named by the
    /// config still have to be registered with [`register_backend`].
    ///
    /// [`register_backend`]: ProbeRegistry::register_backend
    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::with_shard_count(config.resolved_shard_count())
            .with_definitions(Arc::new(StaticDefinitions::from_config(config)))
    }

    fn from_store(store: ShardStore) -> Self {
        Self {
            store,
            backends: BackendTable::new(),
            definitions: Arc::new(StaticDefinitions::new()),
            cache: Arc::new(TtlCache::new()),
        }
    }

    /// Replaces the definition registry.
    pub fn with_definitions(mut self, definitions: Arc<dyn DefinitionRegistry>) -> Self {
        self.definitions = definitions;
        self
    }

    /// Replaces the value cache.
    pub fn with_cache(mut self, cache: Arc<dyn ValueCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Makes a backend available under `key`.
    pub fn register_backend(&self, key: impl Into<String>, backend: Arc<dyn ProbeBackend>) {
        self.backends.register(key, backend);
    }

    /// Removes the backend registered under `key`.
    pub fn unregister_backend(&self, key: &str) -> Option<Arc<dyn ProbeBackend>> {
        self.backends.unregister(key)
    }

    /// The underlying shard store.
    pub fn store(&self) -> &ShardStore {
        &self.store
    }

    /// Number of shards the store was built with.
    pub fn shard_count(&self) -> usize {
        self.store.shard_count()
    }

    /// Number of registered entries.
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    fn entry(&self, name: &EntryName) -> RegistryResult<Entry> {
        self.store
            .read_one(name)?
            .ok_or_else(|| RegistryError::NotFound(name.clone()))
    }

    /// Registers a new entry.
    ///
    /// The definition registry supplies the dispatch target and default
    /// options; `options` override those defaults key by key. Creating a name
    /// that already exists with the same type succeeds without touching it.
    /// Of several concurrent creates for one name, exactly one stores its entry.
    pub fn create(
        &self,
        name: impl Into<EntryName>,
        probe_type: impl Into<ProbeType>,
        options: Options,
    ) -> RegistryResult<()> {
        let name = name.into();
        let probe_type = probe_type.into();

        if let Some(existing) = self.store.read_one(&name)? {
            if existing.probe_type == probe_type {
                return Ok(());
            }
            return Err(RegistryError::AlreadyExists {
                name,
                existing: existing.probe_type,
            });
        }

        let template = self
            .definitions
            .lookup_definition(&name, &probe_type)
            .ok_or_else(|| RegistryError::UnknownType {
                name: name.clone(),
                probe_type: probe_type.clone(),
            })?;
        let options = template.options.merged(&options);
        let local = LocalOptions::parse(&options)?;

        let mut entry = Entry::new(name, template.probe_type, template.target);
        entry.options = options;
        entry.cache_ttl = local.cache_ttl.unwrap_or_default();
        entry.status = local.status.unwrap_or_default();

        let existing = if entry.is_native_counter() {
            log::debug!("Creating counter {}", entry.name);
            counter::create(&self.store, entry)?
        } else {
            entry.probe_ref = self.backends.create(&entry)?;
            self.insert_backend_entry(entry)?
        };

        // Another create for the same name got in first.
        match existing {
            None => Ok(()),
            Some(existing) if existing.probe_type == probe_type => Ok(()),
            Some(existing) => Err(RegistryError::AlreadyExists {
                name: existing.name,
                existing: existing.probe_type,
            }),
        }
    }

    /// Stores an entry whose backend state was just created. If the entry
    /// does not end up in the store, that state is released again.
    fn insert_backend_entry(&self, entry: Entry) -> RegistryResult<Option<Entry>> {
        let inserted = self.store.insert_new(entry.clone());
        match &inserted {
            Ok(None) => {
                log::debug!(
                    "Created {} {} on backend `{}`",
                    entry.probe_type,
                    entry.name,
                    entry.target
                );
                return inserted;
            }
            Ok(Some(_)) => log::debug!("Lost the race to create {}", entry.name),
            Err(e) => log::warn!("Failed to store {}: {}", entry.name, e),
        }
        if let Err(e) = self.backends.delete(&entry) {
            log::warn!("Backend failed to release {}: {}", entry.name, e);
        }
        inserted
    }

    /// Deletes any existing entry of that name, then creates it afresh.
    pub fn re_register(
        &self,
        name: impl Into<EntryName>,
        probe_type: impl Into<ProbeType>,
        options: Options,
    ) -> RegistryResult<()> {
        let name = name.into();
        match self.delete(&name) {
            Ok(()) => log::debug!("Re-registering {}", name),
            Err(e) if e.is_not_found() => {}
            Err(e) => log::warn!("Re-registering {} after a failed delete: {}", name, e),
        }
        self.create(name, probe_type, options)
    }

    /// Records a measurement. Counters take an integer delta.
    pub fn update(&self, name: &EntryName, value: &Value) -> RegistryResult<()> {
        let entry = self.entry(name)?;
        if !entry.status.is_enabled() {
            return Ok(());
        }
        if entry.is_native_counter() {
            counter::update(&self.store, name, value)
        } else {
            self.backends.update(&entry, value)
        }
    }

    /// Like [`update`](ProbeRegistry::update), creating the entry first if it
    /// does not exist yet.
    pub fn update_or_create(
        &self,
        name: impl Into<EntryName>,
        value: &Value,
        probe_type: impl Into<ProbeType>,
        options: Options,
    ) -> RegistryResult<()> {
        let name = name.into();
        match self.update(&name, value) {
            Err(RegistryError::NotFound(_)) => {
                self.create(name.clone(), probe_type, options)?;
                self.update(&name, value)
            }
            other => other,
        }
    }

    /// Reads the current value. Disabled entries report [`Value::Unavailable`].
    pub fn read_value(&self, name: &EntryName) -> RegistryResult<Value> {
        let entry = self.entry(name)?;
        self.value_of(&entry)
    }

    fn value_of(&self, entry: &Entry) -> RegistryResult<Value> {
        if !entry.status.is_enabled() {
            return Ok(Value::Unavailable);
        }
        if entry.is_native_counter() {
            return counter::read_value(&self.store, &entry.name);
        }
        read_through(self.cache.as_ref(), entry, || self.backends.read_value(entry))
    }

    /// Reads every entry whose name starts with `prefix`.
    ///
    /// Entries removed while the listing runs are skipped. An entry whose
    /// backend fails to read is reported as [`Value::Unavailable`].
    pub fn get_values(&self, prefix: &EntryName) -> RegistryResult<Vec<(EntryName, Value)>> {
        let mut values = Vec::new();
        for triple in self.find_entries(prefix)? {
            match self.read_value(&triple.name) {
                Ok(value) => values.push((triple.name, value)),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    log::warn!("Failed to read {}: {}", triple.name, e);
                    values.push((triple.name, Value::Unavailable));
                }
            }
        }
        Ok(values)
    }

    /// Asks the backend to refresh its measurement. A no-op for counters.
    pub fn sample(&self, name: &EntryName) -> RegistryResult<()> {
        let entry = self.entry(name)?;
        if !entry.status.is_enabled() || entry.is_native_counter() {
            return Ok(());
        }
        self.backends.sample(&entry)
    }

    /// Resets the entry to its zero state and drops its cached value.
    pub fn reset(&self, name: &EntryName) -> RegistryResult<()> {
        let entry = self.entry(name)?;
        if !entry.status.is_enabled() {
            return Ok(());
        }
        if entry.is_native_counter() {
            return counter::reset(&self.store, self.cache.as_ref(), name);
        }
        self.cache.delete(name);
        self.backends.reset(&entry)?;
        // Reads that sampled the backend before the reset must not cache it.
        self.cache.delete(name);
        log::debug!("Reset {}", name);
        self.store
            .update_fields(name, &[FieldUpdate::Timestamp(current_timestamp_ms())])
    }

    /// Removes the entry.
    ///
    /// The entry is removed from the store even when the backend fails to
    /// release its state; that failure is still returned.
    pub fn delete(&self, name: &EntryName) -> RegistryResult<()> {
        let entry = self.entry(name)?;
        if entry.is_native_counter() {
            counter::delete(&self.store, name)?;
            self.cache.delete(name);
            log::debug!("Deleted counter {}", name);
            return Ok(());
        }

        let released = self.backends.delete(&entry);
        if let Err(e) = &released {
            log::warn!("Backend failed to release {}: {}", name, e);
        }
        self.store.remove_all(name)?;
        self.cache.delete(name);
        log::debug!("Deleted {}", name);
        released
    }

    /// Applies new options to an existing entry.
    ///
    /// A disabled entry only accepts options that re-enable it. Backend
    /// entries hand the options to their backend before anything is stored.
    /// A cached value stays valid until its TTL runs out.
    pub fn configure(&self, name: &EntryName, options: Options) -> RegistryResult<()> {
        let entry = self.entry(name)?;
        let local = LocalOptions::parse(&options)?;
        if !entry.status.is_enabled() && local.status != Some(EntryStatus::Enabled) {
            return Err(RegistryError::Disabled(name.clone()));
        }
        if !entry.is_native_counter() {
            self.backends.configure(&entry, &options)?;
        }

        let updates = [
            FieldUpdate::Options(entry.options.merged(&options)),
            FieldUpdate::CacheTtl(local.cache_ttl.unwrap_or(entry.cache_ttl)),
            FieldUpdate::Status(local.status.unwrap_or(entry.status)),
            FieldUpdate::Timestamp(current_timestamp_ms()),
        ];
        self.store.update_fields(name, &updates)
    }

    /// Returns the full record of an entry with its value read now, or `None`
    /// if no such entry exists.
    pub fn info(&self, name: &EntryName) -> Option<EntryInfo> {
        let entry = self.lookup_for_info(name)?;
        let value = self.value_for_info(&entry);
        Some(EntryInfo::new(entry, value))
    }

    /// Returns a single field of an entry's record. Only
    /// [`InfoField::Value`] reads the entry's value.
    pub fn info_field(&self, name: &EntryName, field: InfoField) -> Option<InfoValue> {
        let entry = self.lookup_for_info(name)?;
        let value = if field.needs_value() {
            self.value_for_info(&entry)
        } else {
            Value::Unavailable
        };
        Some(EntryInfo::new(entry, value).field(field))
    }

    fn lookup_for_info(&self, name: &EntryName) -> Option<Entry> {
        self.store.read_one(name).unwrap_or_else(|e| {
            log::warn!("Failed to look up {}: {}", name, e);
            None
        })
    }

    fn value_for_info(&self, entry: &Entry) -> Value {
        self.value_of(entry).unwrap_or_else(|e| {
            log::warn!("Failed to read {}: {}", entry.name, e);
            Value::Unavailable
        })
    }

    /// Lists the entries whose leading segments equal `prefix`.
    pub fn find_entries(&self, prefix: &EntryName) -> RegistryResult<Vec<EntryTriple>> {
        let prefix = prefix
            .segments()
            .iter()
            .map(|s| SegmentPattern::Literal(s.clone()))
            .collect();
        query::find_entries(&self.store, prefix)
    }

    /// Like [`find_entries`](ProbeRegistry::find_entries), where a segment
    /// may also be a wildcard.
    pub fn find_entries_matching(
        &self,
        prefix: &[SegmentPattern],
    ) -> RegistryResult<Vec<EntryTriple>> {
        query::find_entries(&self.store, prefix.to_vec())
    }

    /// Runs query patterns over every entry. Result order is unspecified.
    pub fn select(&self, patterns: &[QueryPattern]) -> RegistryResult<Vec<Term>> {
        query::select(&self.store, patterns, None)
    }

    /// Like [`select`](ProbeRegistry::select), returning at most `limit` results.
    pub fn select_limit(
        &self,
        patterns: &[QueryPattern],
        limit: usize,
    ) -> RegistryResult<Vec<Term>> {
        query::select(&self.store, patterns, Some(limit))
    }

    /// Counts the entries matched by any of the patterns.
    pub fn select_count(&self, patterns: &[QueryPattern]) -> RegistryResult<usize> {
        let compiled = query::compile_all(patterns)?;
        query::count(&self.store, &compiled)
    }
}

impl Default for ProbeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probekit_core::{ProbeContext, ProbeRef, ProbeResult};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::{Mutex, Weak};

    /// A gauge that keeps the last value written to it.
    #[derive(Debug, Default)]
    struct GaugeBackend {
        next_ref: AtomicU64,
        values: Mutex<HashMap<EntryName, Value>>,
        reads: AtomicUsize,
        configured: Mutex<Vec<Options>>,
    }

    impl ProbeBackend for GaugeBackend {
        fn create(
            &self,
            name: &EntryName,
            _probe_type: &ProbeType,
            _options: &Options,
        ) -> ProbeResult<Option<ProbeRef>> {
            self.values.lock().unwrap().insert(name.clone(), Value::Integer(0));
            Ok(Some(ProbeRef(self.next_ref.fetch_add(1, Ordering::SeqCst))))
        }

        fn delete(&self, probe: ProbeContext<'_>) -> ProbeResult<()> {
            self.values.lock().unwrap().remove(probe.name);
            Ok(())
        }

        fn read_value(&self, probe: ProbeContext<'_>) -> ProbeResult<Value> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .values
                .lock()
                .unwrap()
                .get(probe.name)
                .cloned()
                .unwrap_or(Value::Unavailable))
        }

        fn update(&self, probe: ProbeContext<'_>, value: &Value) -> ProbeResult<()> {
            self.values.lock().unwrap().insert(probe.name.clone(), value.clone());
            Ok(())
        }

        fn reset(&self, probe: ProbeContext<'_>) -> ProbeResult<()> {
            self.values.lock().unwrap().insert(probe.name.clone(), Value::Integer(0));
            Ok(())
        }

        fn sample(&self, _probe: ProbeContext<'_>) -> ProbeResult<()> {
            Ok(())
        }

        fn configure(&self, _probe: ProbeContext<'_>, options: &Options) -> ProbeResult<()> {
            self.configured.lock().unwrap().push(options.clone());
            Ok(())
        }
    }

    fn registry_with_gauge() -> (ProbeRegistry, Arc<GaugeBackend>) {
        let definitions = Arc::new(StaticDefinitions::new());
        definitions.register_type("gauge", "gauge");
        let registry = ProbeRegistry::with_shard_count(4).with_definitions(definitions);
        let backend = Arc::new(GaugeBackend::default());
        registry.register_backend("gauge", backend.clone());
        (registry, backend)
    }

    fn name(segments: &[&str]) -> EntryName {
        EntryName::from(segments)
    }

    #[test]
    fn test_local_option_parsing() {
        let parsed = LocalOptions::parse(
            &Options::new().with("cache", 250).with("status", "disabled"),
        )
        .unwrap();
        assert_eq!(parsed.cache_ttl, Some(Duration::from_millis(250)));
        assert_eq!(parsed.status, Some(EntryStatus::Disabled));

        assert_eq!(LocalOptions::parse(&Options::new()).unwrap(), LocalOptions::default());
        assert!(matches!(
            LocalOptions::parse(&Options::new().with("cache", -1)),
            Err(RegistryError::IllegalOption { .. })
        ));
        assert!(matches!(
            LocalOptions::parse(&Options::new().with("status", "paused")),
            Err(RegistryError::IllegalOption { .. })
        ));
        assert!(LocalOptions::parse(&Options::new().with("status", 1)).is_err());
    }

    #[test]
    fn test_counter_lifecycle() {
        let registry = ProbeRegistry::with_shard_count(4);
        let n = name(&["jobs", "done"]);

        registry.create(n.clone(), "counter", Options::new()).unwrap();
        registry.update(&n, &Value::Integer(5)).unwrap();
        registry.update(&n, &Value::Integer(-2)).unwrap();
        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(3));

        assert!(matches!(
            registry.update(&n, &Value::Float(1.0)),
            Err(RegistryError::IllegalValue { .. })
        ));

        registry.reset(&n).unwrap();
        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(0));

        registry.delete(&n).unwrap();
        assert!(registry.read_value(&n).unwrap_err().is_not_found());
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_create_is_idempotent_for_same_type() {
        let (registry, _) = registry_with_gauge();
        let n = name(&["a"]);
        registry.create(n.clone(), "counter", Options::new()).unwrap();
        registry.update(&n, &Value::Integer(1)).unwrap();
        registry.create(n.clone(), "counter", Options::new()).unwrap();
        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(1));

        assert!(matches!(
            registry.create(n, "gauge", Options::new()),
            Err(RegistryError::AlreadyExists { .. })
        ));
    }

    /// What a backend does to the registry while it is creating its state.
    #[derive(Debug, Clone, Copy)]
    enum Interference {
        CreateCounter,
        PoisonStore,
    }

    #[derive(Debug, Default)]
    struct InterferingBackend {
        hook: Mutex<Option<(Weak<ProbeRegistry>, Interference)>>,
        released: Mutex<Vec<Option<ProbeRef>>>,
    }

    impl ProbeBackend for InterferingBackend {
        fn create(
            &self,
            name: &EntryName,
            _probe_type: &ProbeType,
            _options: &Options,
        ) -> ProbeResult<Option<ProbeRef>> {
            let hook = self.hook.lock().unwrap().take();
            if let Some((registry, interference)) = hook {
                let registry = registry.upgrade().unwrap();
                match interference {
                    Interference::CreateCounter => registry
                        .create(name.clone(), "counter", Options::new())
                        .unwrap(),
                    Interference::PoisonStore => registry.store().poison_primary(),
                }
            }
            Ok(Some(ProbeRef(42)))
        }

        fn delete(&self, probe: ProbeContext<'_>) -> ProbeResult<()> {
            self.released.lock().unwrap().push(probe.probe_ref);
            Ok(())
        }

        fn read_value(&self, _probe: ProbeContext<'_>) -> ProbeResult<Value> {
            Ok(Value::Integer(0))
        }

        fn update(&self, _probe: ProbeContext<'_>, _value: &Value) -> ProbeResult<()> {
            Ok(())
        }

        fn reset(&self, _probe: ProbeContext<'_>) -> ProbeResult<()> {
            Ok(())
        }

        fn sample(&self, _probe: ProbeContext<'_>) -> ProbeResult<()> {
            Ok(())
        }

        fn configure(&self, _probe: ProbeContext<'_>, _options: &Options) -> ProbeResult<()> {
            Ok(())
        }
    }

    fn interfering_registry(
        interference: Interference,
    ) -> (Arc<ProbeRegistry>, Arc<InterferingBackend>) {
        let definitions = Arc::new(StaticDefinitions::new());
        definitions.register_type("gauge", "interfering");
        let registry = Arc::new(ProbeRegistry::with_shard_count(4).with_definitions(definitions));
        let backend = Arc::new(InterferingBackend::default());
        registry.register_backend("interfering", backend.clone());
        *backend.hook.lock().unwrap() = Some((Arc::downgrade(&registry), interference));
        (registry, backend)
    }

    #[test]
    fn test_create_losing_to_a_concurrent_create_releases_backend_state() {
        let (registry, backend) = interfering_registry(Interference::CreateCounter);
        let n = name(&["contested"]);

        let err = registry.create(n.clone(), "gauge", Options::new()).unwrap_err();

        assert!(matches!(
            err,
            RegistryError::AlreadyExists { existing: ProbeType::Counter, .. }
        ));
        assert_eq!(*backend.released.lock().unwrap(), vec![Some(ProbeRef(42))]);
        let info = registry.info(&n).unwrap();
        assert_eq!(info.probe_type, ProbeType::Counter);
        assert_eq!(info.probe_ref, None);
    }

    #[test]
    fn test_failed_store_insert_releases_backend_state() {
        let (registry, backend) = interfering_registry(Interference::PoisonStore);

        let err = registry
            .create(name(&["doomed"]), "gauge", Options::new())
            .unwrap_err();

        assert!(matches!(err, RegistryError::Storage(_)));
        assert_eq!(*backend.released.lock().unwrap(), vec![Some(ProbeRef(42))]);
    }

    #[test]
    fn test_unknown_type_is_not_found() {
        let registry = ProbeRegistry::with_shard_count(1);
        let err = registry
            .create(name(&["a"]), "spiral", Options::new())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_illegal_option_commits_nothing() {
        let (registry, backend) = registry_with_gauge();
        let err = registry
            .create(name(&["a"]), "gauge", Options::new().with("cache", "soon"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::IllegalOption { .. }));
        assert!(backend.values.lock().unwrap().is_empty());
        assert_eq!(registry.entry_count(), 0);
    }

    #[test]
    fn test_backend_entry_gets_ref() {
        let (registry, _) = registry_with_gauge();
        let n = name(&["pool", "size"]);
        registry.create(n.clone(), "gauge", Options::new()).unwrap();
        registry.update(&n, &Value::Integer(12)).unwrap();

        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(12));
        assert_eq!(
            registry.info_field(&n, InfoField::Ref),
            Some(InfoValue::Ref(Some(ProbeRef(0))))
        );
    }

    #[test]
    fn test_disabled_entry() {
        let (registry, backend) = registry_with_gauge();
        let n = name(&["g"]);
        registry
            .create(n.clone(), "gauge", Options::new().with("status", "disabled"))
            .unwrap();

        assert_eq!(registry.read_value(&n).unwrap(), Value::Unavailable);
        registry.update(&n, &Value::Integer(9)).unwrap();
        registry.sample(&n).unwrap();
        registry.reset(&n).unwrap();
        assert_eq!(backend.reads.load(Ordering::SeqCst), 0);
        assert_eq!(
            backend.values.lock().unwrap().get(&n),
            Some(&Value::Integer(0))
        );

        assert!(matches!(
            registry.configure(&n, Options::new().with("cache", 10)),
            Err(RegistryError::Disabled(_))
        ));
        registry
            .configure(&n, Options::new().with("status", "enabled"))
            .unwrap();
        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(0));
    }

    #[test]
    fn test_configure_merges_options_and_reaches_backend() {
        let (registry, backend) = registry_with_gauge();
        let n = name(&["g"]);
        registry
            .create(n.clone(), "gauge", Options::new().with("unit", "ms").with("cache", 100))
            .unwrap();
        registry
            .configure(&n, Options::new().with("unit", "s").with("window", 60))
            .unwrap();

        let info = registry.info(&n).unwrap();
        assert_eq!(info.options.get("unit"), Some(&json!("s")));
        assert_eq!(info.options.get("window"), Some(&json!(60)));
        assert_eq!(info.cache_ttl, Duration::from_millis(100));
        assert_eq!(backend.configured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_info_of_missing_entry() {
        let registry = ProbeRegistry::with_shard_count(1);
        assert!(registry.info(&name(&["nope"])).is_none());
        assert!(registry.info_field(&name(&["nope"]), InfoField::Type).is_none());
    }

    #[test]
    fn test_info_reads_counter_value_live() {
        let registry = ProbeRegistry::with_shard_count(2);
        let n = name(&["c"]);
        registry.create(n.clone(), "counter", Options::new()).unwrap();
        registry.update(&n, &Value::Integer(4)).unwrap();

        let info = registry.info(&n).unwrap();
        assert_eq!(info.value, Value::Integer(4));
        assert_eq!(info.probe_type, ProbeType::Counter);
        assert_eq!(
            registry.info_field(&n, InfoField::Value),
            Some(InfoValue::Value(Value::Integer(4)))
        );
    }

    #[test]
    fn test_update_or_create() {
        let registry = ProbeRegistry::with_shard_count(2);
        let n = name(&["lazy"]);
        registry
            .update_or_create(n.clone(), &Value::Integer(2), "counter", Options::new())
            .unwrap();
        registry
            .update_or_create(n.clone(), &Value::Integer(3), "counter", Options::new())
            .unwrap();
        assert_eq!(registry.read_value(&n).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_re_register_replaces_type() {
        let (registry, _) = registry_with_gauge();
        let n = name(&["x"]);
        registry.create(n.clone(), "counter", Options::new()).unwrap();
        registry.re_register(n.clone(), "gauge", Options::new()).unwrap();
        assert_eq!(
            registry.info_field(&n, InfoField::Type),
            Some(InfoValue::Type(ProbeType::from("gauge")))
        );
        registry.re_register(name(&["fresh"]), "counter", Options::new()).unwrap();
        assert_eq!(registry.entry_count(), 2);
    }

    #[test]
    fn test_get_values_by_prefix() {
        let (registry, _) = registry_with_gauge();
        registry.create(name(&["svc", "a"]), "counter", Options::new()).unwrap();
        registry.create(name(&["svc", "b"]), "gauge", Options::new()).unwrap();
        registry.create(name(&["other"]), "counter", Options::new()).unwrap();
        registry.update(&name(&["svc", "a"]), &Value::Integer(7)).unwrap();

        let mut values = registry.get_values(&name(&["svc"])).unwrap();
        values.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(
            values,
            vec![
                (name(&["svc", "a"]), Value::Integer(7)),
                (name(&["svc", "b"]), Value::Integer(0)),
            ]
        );
    }

    #[test]
    fn test_config_driven_registry() {
        let config = RegistryConfig::from_json(
            r#"{
                "shard_count": 3,
                "types": [{ "probe_type": "gauge", "backend": "gauge" }],
                "defaults": [{ "prefix": ["db"], "probe_type": "gauge", "options": { "cache": 5000 } }]
            }"#,
        )
        .unwrap();
        let registry = ProbeRegistry::from_config(&config);
        registry.register_backend("gauge", Arc::new(GaugeBackend::default()));
        assert_eq!(registry.shard_count(), 3);

        let n = name(&["db", "conns"]);
        registry.create(n.clone(), "gauge", Options::new()).unwrap();
        assert_eq!(
            registry.info_field(&n, InfoField::Cache),
            Some(InfoValue::Cache(Duration::from_millis(5000)))
        );
    }
}
