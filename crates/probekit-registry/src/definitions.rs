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

//! A table-driven [`DefinitionRegistry`].

use crate::config::RegistryConfig;
use probekit_core::{
    DefinitionRegistry, DispatchTarget, EntryName, EntryTemplate, Options, ProbeType,
};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone)]
struct PrefixDefaults {
    prefix: EntryName,
    probe_type: ProbeType,
    options: Options,
}

/// Resolves types through a type → target table and applies default options
/// registered for name prefixes.
///
/// The counter type is bound to the native target from the start. When several
/// prefixes match a name, their defaults are merged from the shortest to the
/// longest prefix, so the most specific one wins key by key.
#[derive(Debug)]
pub struct StaticDefinitions {
    types: RwLock<HashMap<ProbeType, DispatchTarget>>,
    defaults: RwLock<Vec<PrefixDefaults>>,
}

impl StaticDefinitions {
    /// Creates a table that only knows the native counter.
    pub fn new() -> Self {
        let mut types = HashMap::new();
        types.insert(ProbeType::Counter, DispatchTarget::Native);
        Self {
            types: RwLock::new(types),
            defaults: RwLock::new(Vec::new()),
        }
    }

    /// Builds the table from the `types` and `defaults` sections of a config.
    pub fn from_config(config: &RegistryConfig) -> Self {
        let definitions = Self::new();
        for binding in &config.types {
            definitions.register_type(binding.probe_type.clone(), binding.backend.clone());
        }
        for defaults in &config.defaults {
            definitions.set_defaults(
                defaults.prefix.clone(),
                defaults.probe_type.clone(),
                defaults.options.clone(),
            );
        }
        definitions
    }

    /// Routes entries of `probe_type` to the backend registered under `backend`.
    pub fn register_type(&self, probe_type: impl Into<ProbeType>, backend: impl Into<String>) {
        let probe_type = probe_type.into();
        let backend = backend.into();
        match self.types.write() {
            Ok(mut types) => {
                log::debug!("Type `{}` bound to backend `{}`", probe_type, backend);
                types.insert(probe_type, DispatchTarget::Backend(backend));
            }
            Err(_) => log::warn!("Failed to bind type `{}`: lock poisoned", probe_type),
        }
    }

    /// Sets the default options for `probe_type` entries under `prefix`,
    /// replacing earlier defaults for the same prefix and type.
    pub fn set_defaults(
        &self,
        prefix: impl Into<EntryName>,
        probe_type: impl Into<ProbeType>,
        options: Options,
    ) {
        let prefix = prefix.into();
        let probe_type = probe_type.into();
        let Ok(mut defaults) = self.defaults.write() else {
            log::warn!("Failed to set defaults for `{}`: lock poisoned", prefix);
            return;
        };
        defaults.retain(|d| !(d.prefix == prefix && d.probe_type == probe_type));
        defaults.push(PrefixDefaults {
            prefix,
            probe_type,
            options,
        });
    }

    fn defaults_for(&self, name: &EntryName, probe_type: &ProbeType) -> Options {
        let Ok(defaults) = self.defaults.read() else {
            return Options::new();
        };
        let mut matching: Vec<_> = defaults
            .iter()
            .filter(|d| d.probe_type == *probe_type && name.starts_with(&d.prefix))
            .collect();
        matching.sort_by_key(|d| d.prefix.len());
        matching.into_iter().fold(Options::new(), |mut acc, d| {
            acc.merge(&d.options);
            acc
        })
    }
}

impl Default for StaticDefinitions {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionRegistry for StaticDefinitions {
    fn lookup_definition(
        &self,
        name: &EntryName,
        probe_type: &ProbeType,
    ) -> Option<EntryTemplate> {
        let target = self.types.read().ok()?.get(probe_type).cloned()?;
        Some(EntryTemplate {
            probe_type: probe_type.clone(),
            target,
            options: self.defaults_for(name, probe_type),
        })
    }
}
