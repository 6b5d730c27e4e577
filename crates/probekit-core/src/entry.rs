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

//! The registry entry and the small types it is built from.

use crate::name::EntryName;
use crate::options::Options;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The measurement kind of an entry.
///
/// `counter` is reserved for the built-in striped counter; every other symbol
/// is defined by whichever backend registers it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProbeType {
    /// The native counter, handled without a backend.
    Counter,
    /// A backend-defined kind such as `"histogram"` or `"gauge"`.
    Custom(String),
}

impl ProbeType {
    /// Creates a type from its symbol. `"counter"` always maps to [`ProbeType::Counter`].
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        if symbol == "counter" {
            ProbeType::Counter
        } else {
            ProbeType::Custom(symbol)
        }
    }

    /// Returns `true` for the built-in counter.
    pub fn is_counter(&self) -> bool {
        matches!(self, ProbeType::Counter)
    }

    /// The symbol of this type.
    pub fn as_str(&self) -> &str {
        match self {
            ProbeType::Counter => "counter",
            ProbeType::Custom(s) => s,
        }
    }
}

impl Display for ProbeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ProbeType {
    fn from(s: String) -> Self {
        ProbeType::new(s)
    }
}

impl From<&str> for ProbeType {
    fn from(s: &str) -> Self {
        ProbeType::new(s)
    }
}

impl From<ProbeType> for String {
    fn from(t: ProbeType) -> Self {
        match t {
            ProbeType::Counter => "counter".to_string(),
            ProbeType::Custom(s) => s,
        }
    }
}

/// Selects the implementation responsible for an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchTarget {
    /// Handled natively by the counter fast path.
    Native,
    /// Handled by the backend registered under this key.
    Backend(String),
}

impl Display for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchTarget::Native => f.write_str("native"),
            DispatchTarget::Backend(key) => f.write_str(key),
        }
    }
}

/// Opaque handle returned by a backend when it creates an entry.
///
/// The registry never interprets it; it is handed back on every later call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProbeRef(pub u64);

impl Display for ProbeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether an entry currently accepts operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// The entry is live.
    #[default]
    Enabled,
    /// Reads report `Unavailable`; updates, samples and resets are ignored.
    Disabled,
}

impl EntryStatus {
    /// Returns `true` if the status is [`EntryStatus::Enabled`].
    pub fn is_enabled(self) -> bool {
        self == EntryStatus::Enabled
    }

    /// The symbol of this status as used in options.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Enabled => "enabled",
            EntryStatus::Disabled => "disabled",
        }
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(EntryStatus::Enabled),
            "disabled" => Ok(EntryStatus::Disabled),
            other => Err(format!("unknown status `{other}`")),
        }
    }
}

/// A complete registry entry as stored in one shard.
///
/// For counters `value` is the partial count of the shard the entry was read
/// from; the observable counter value is the sum over all shards.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Unique hierarchical key.
    pub name: EntryName,
    /// Measurement kind.
    pub probe_type: ProbeType,
    /// Implementation handling this entry.
    pub target: DispatchTarget,
    /// Backend handle, absent for native counters.
    pub probe_ref: Option<ProbeRef>,
    /// Merged options, including the locally interpreted ones.
    pub options: Options,
    /// How long a backend read stays cached; zero disables caching.
    pub cache_ttl: Duration,
    /// Current status.
    pub status: EntryStatus,
    /// Counter payload.
    pub value: i64,
    /// Last metadata mutation, in milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

impl Entry {
    /// Creates an enabled entry with no cache, no backend handle and a zero value.
    pub fn new(name: EntryName, probe_type: ProbeType, target: DispatchTarget) -> Self {
        Self {
            name,
            probe_type,
            target,
            probe_ref: None,
            options: Options::new(),
            cache_ttl: Duration::ZERO,
            status: EntryStatus::Enabled,
            value: 0,
            timestamp: current_timestamp_ms(),
        }
    }

    /// Returns `true` if this entry is served by the counter fast path.
    pub fn is_native_counter(&self) -> bool {
        self.probe_type.is_counter() && self.target == DispatchTarget::Native
    }
}

/// The initial type, target and default options for a new entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryTemplate {
    /// Measurement kind the entry will have.
    pub probe_type: ProbeType,
    /// Implementation that will handle it.
    pub target: DispatchTarget,
    /// Default options, overridden by the caller's options.
    pub options: Options,
}

impl EntryTemplate {
    /// The template of the built-in counter.
    pub fn counter() -> Self {
        Self {
            probe_type: ProbeType::Counter,
            target: DispatchTarget::Native,
            options: Options::new(),
        }
    }
}

/// Milliseconds since the UNIX epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
