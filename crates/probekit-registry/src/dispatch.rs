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

//! Routing of entry operations to their probe backend.

use probekit_core::{
    DispatchTarget, Entry, Options, ProbeBackend, ProbeContext, ProbeRef, RegistryError,
    RegistryResult, Value,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A thread-safe table of backends keyed by their dispatch key.
///
/// Calls are made with the entry's `(name, type, ref)` triple and their errors
/// are returned as-is; nothing is retried.
#[derive(Debug, Default)]
pub struct BackendTable {
    backends: RwLock<HashMap<String, Arc<dyn ProbeBackend>>>,
}

impl BackendTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a backend, returning the one it replaced.
    pub fn register(
        &self,
        key: impl Into<String>,
        backend: Arc<dyn ProbeBackend>,
    ) -> Option<Arc<dyn ProbeBackend>> {
        let key = key.into();
        match self.backends.write() {
            Ok(mut backends) => {
                log::debug!("Registered probe backend: {}", key);
                backends.insert(key, backend)
            }
            Err(_) => {
                log::warn!("Failed to register probe backend `{}`: lock poisoned", key);
                None
            }
        }
    }

    /// Removes a backend. Entries still pointing at it fail with
    /// `BackendUnavailable` until it is registered again.
    pub fn unregister(&self, key: &str) -> Option<Arc<dyn ProbeBackend>> {
        self.backends.write().ok()?.remove(key)
    }

    /// Returns `true` if a backend is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.backends
            .read()
            .map(|backends| backends.contains_key(key))
            .unwrap_or(false)
    }

    /// Resolves a dispatch target. The native target has no backend.
    pub fn resolve(&self, target: &DispatchTarget) -> Option<Arc<dyn ProbeBackend>> {
        match target {
            DispatchTarget::Native => None,
            DispatchTarget::Backend(key) => self.backends.read().ok()?.get(key).cloned(),
        }
    }

    fn backend_for(&self, entry: &Entry) -> RegistryResult<Arc<dyn ProbeBackend>> {
        self.resolve(&entry.target)
            .ok_or_else(|| RegistryError::BackendUnavailable {
                name: entry.name.clone(),
                backend: match &entry.target {
                    DispatchTarget::Native => "native".to_string(),
                    DispatchTarget::Backend(key) => key.clone(),
                },
            })
    }

    /// Asks the entry's backend to create its state.
    ///
    /// `Ok(None)` means the backend keeps no handle; on error nothing should be
    /// stored for the entry. A missing backend makes the type unknown.
    pub fn create(&self, entry: &Entry) -> RegistryResult<Option<ProbeRef>> {
        let backend = self
            .resolve(&entry.target)
            .ok_or_else(|| RegistryError::UnknownType {
                name: entry.name.clone(),
                probe_type: entry.probe_type.clone(),
            })?;
        Ok(backend.create(&entry.name, &entry.probe_type, &entry.options)?)
    }

    /// Releases the entry's backend state.
    pub fn delete(&self, entry: &Entry) -> RegistryResult<()> {
        let backend = self.backend_for(entry)?;
        Ok(backend.delete(context(entry))?)
    }

    /// Reads the value straight from the backend.
    pub fn read_value(&self, entry: &Entry) -> RegistryResult<Value> {
        let backend = self.backend_for(entry)?;
        Ok(backend.read_value(context(entry))?)
    }

    /// Forwards a measurement.
    pub fn update(&self, entry: &Entry, value: &Value) -> RegistryResult<()> {
        let backend = self.backend_for(entry)?;
        Ok(backend.update(context(entry), value)?)
    }

    /// Resets the backend state.
    pub fn reset(&self, entry: &Entry) -> RegistryResult<()> {
        let backend = self.backend_for(entry)?;
        Ok(backend.reset(context(entry))?)
    }

    /// Triggers a backend refresh.
    pub fn sample(&self, entry: &Entry) -> RegistryResult<()> {
        let backend = self.backend_for(entry)?;
        Ok(backend.sample(context(entry))?)
    }

    /// Passes new options to the backend.
    pub fn configure(&self, entry: &Entry, options: &Options) -> RegistryResult<()> {
        let backend = self.backend_for(entry)?;
        Ok(backend.configure(context(entry), options)?)
    }
}

fn context(entry: &Entry) -> ProbeContext<'_> {
    ProbeContext {
        name: &entry.name,
        probe_type: &entry.probe_type,
        probe_ref: entry.probe_ref,
    }
}
