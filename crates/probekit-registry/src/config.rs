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

//! Registry configuration, loadable from JSON.

use crate::storage::default_shard_count;
use anyhow::Context;
use probekit_core::{EntryName, Options, ProbeType};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Binds an entry type to the backend that implements it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeConfig {
    /// Type symbol, e.g. `"histogram"`.
    pub probe_type: ProbeType,
    /// Key the backend is registered under.
    pub backend: String,
}

/// Default options for entries of a type below a name prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Name prefix the defaults apply to; empty means every name.
    #[serde(default = "root_prefix")]
    pub prefix: EntryName,
    /// Type the defaults apply to.
    pub probe_type: ProbeType,
    /// Options merged under the caller's options at creation.
    #[serde(default)]
    pub options: Options,
}

fn root_prefix() -> EntryName {
    EntryName::new(Vec::<String>::new())
}

/// Complete registry configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Number of shards; defaults to the available parallelism.
    #[serde(default)]
    pub shard_count: Option<usize>,
    /// Type to backend bindings.
    #[serde(default)]
    pub types: Vec<TypeConfig>,
    /// Per-prefix default options.
    #[serde(default)]
    pub defaults: Vec<DefaultsConfig>,
}

impl RegistryConfig {
    /// Load registry configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load registry configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading registry config {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("parsing registry config {}", path.display()))
    }

    /// Save registry configuration to JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// The shard count to build the store with.
    pub fn resolved_shard_count(&self) -> usize {
        self.shard_count.unwrap_or_else(default_shard_count).max(1)
    }
}
