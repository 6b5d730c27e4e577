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

#![allow(dead_code)]

use probekit_core::{
    EntryName, Options, ProbeBackend, ProbeContext, ProbeRef, ProbeResult, ProbeType, Value,
};
use probekit_registry::{ProbeRegistry, StaticDefinitions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A backend that stores the last value per entry and counts every call.
#[derive(Debug, Default)]
pub struct CountingBackend {
    next_ref: AtomicU64,
    values: Mutex<HashMap<EntryName, Value>>,
    pub creates: AtomicUsize,
    pub reads: AtomicUsize,
    pub resets: AtomicUsize,
    pub samples: AtomicUsize,
    pub deletes: AtomicUsize,
    pub configures: AtomicUsize,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
}

impl CountingBackend {
    /// Changes the value behind the registry's back.
    pub fn set(&self, name: &EntryName, value: Value) {
        self.values.lock().unwrap().insert(name.clone(), value);
    }

    pub fn holds(&self, name: &EntryName) -> bool {
        self.values.lock().unwrap().contains_key(name)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ProbeBackend for CountingBackend {
    fn create(
        &self,
        name: &EntryName,
        _probe_type: &ProbeType,
        _options: &Options,
    ) -> ProbeResult<Option<ProbeRef>> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            anyhow::bail!("backend refused {}", name);
        }
        self.set(name, Value::Integer(0));
        Ok(Some(ProbeRef(self.next_ref.fetch_add(1, Ordering::SeqCst) + 1)))
    }

    fn delete(&self, probe: ProbeContext<'_>) -> ProbeResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            anyhow::bail!("backend could not release {}", probe.name);
        }
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
        self.set(probe.name, value.clone());
        Ok(())
    }

    fn reset(&self, probe: ProbeContext<'_>) -> ProbeResult<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        self.set(probe.name, Value::Integer(0));
        Ok(())
    }

    fn sample(&self, _probe: ProbeContext<'_>) -> ProbeResult<()> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn configure(&self, _probe: ProbeContext<'_>, _options: &Options) -> ProbeResult<()> {
        self.configures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A registry where `histogram` and `gauge` entries go to a counting backend.
pub fn setup() -> (ProbeRegistry, Arc<CountingBackend>, Arc<StaticDefinitions>) {
    let _ = env_logger::builder().is_test(true).try_init();

    let definitions = Arc::new(StaticDefinitions::new());
    definitions.register_type("histogram", "mock");
    definitions.register_type("gauge", "mock");

    let registry = ProbeRegistry::with_shard_count(4).with_definitions(definitions.clone());
    let backend = Arc::new(CountingBackend::default());
    registry.register_backend("mock", backend.clone());
    (registry, backend, definitions)
}

pub fn name(segments: &[&str]) -> EntryName {
    EntryName::from(segments)
}
