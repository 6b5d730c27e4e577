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

//! Entry records as reported by `info`.

use probekit_core::{
    DispatchTarget, Entry, EntryName, EntryStatus, Options, ProbeRef, ProbeType, Value,
};
use serde::Serialize;
use std::str::FromStr;
use std::time::Duration;

/// The metadata record of an entry, with its value read at the time of the call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    /// Entry name.
    pub name: EntryName,
    /// Entry type.
    pub probe_type: ProbeType,
    /// Implementation handling the entry.
    pub target: DispatchTarget,
    /// Backend handle, if any.
    pub probe_ref: Option<ProbeRef>,
    /// Merged options.
    pub options: Options,
    /// Cache TTL.
    #[serde(rename = "cache_ttl_ms", serialize_with = "as_millis")]
    pub cache_ttl: Duration,
    /// Current status.
    pub status: EntryStatus,
    /// Live value.
    pub value: Value,
    /// Last metadata mutation, in milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

fn as_millis<S: serde::Serializer>(ttl: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(ttl.as_millis() as u64)
}

impl EntryInfo {
    pub(crate) fn new(entry: Entry, value: Value) -> Self {
        Self {
            name: entry.name,
            probe_type: entry.probe_type,
            target: entry.target,
            probe_ref: entry.probe_ref,
            options: entry.options,
            cache_ttl: entry.cache_ttl,
            status: entry.status,
            value,
            timestamp: entry.timestamp,
        }
    }

    /// Extracts a single field.
    pub fn field(&self, field: InfoField) -> InfoValue {
        match field {
            InfoField::Name => InfoValue::Name(self.name.clone()),
            InfoField::Type => InfoValue::Type(self.probe_type.clone()),
            InfoField::Ref => InfoValue::Ref(self.probe_ref),
            InfoField::Options => InfoValue::Options(self.options.clone()),
            InfoField::Cache => InfoValue::Cache(self.cache_ttl),
            InfoField::Status => InfoValue::Status(self.status),
            InfoField::Value => InfoValue::Value(self.value.clone()),
            InfoField::Timestamp => InfoValue::Timestamp(self.timestamp),
        }
    }
}

/// Selects one field of an [`EntryInfo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfoField {
    /// The entry name.
    Name,
    /// The entry type.
    Type,
    /// The backend handle.
    Ref,
    /// The merged options.
    Options,
    /// The cache TTL.
    Cache,
    /// The status.
    Status,
    /// The live value.
    Value,
    /// The last mutation time.
    Timestamp,
}

impl InfoField {
    /// Returns `true` if reading this field needs the entry's value.
    pub fn needs_value(self) -> bool {
        self == InfoField::Value
    }
}

impl FromStr for InfoField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => InfoField::Name,
            "type" => InfoField::Type,
            "ref" => InfoField::Ref,
            "options" => InfoField::Options,
            "cache" => InfoField::Cache,
            "status" => InfoField::Status,
            "value" => InfoField::Value,
            "timestamp" => InfoField::Timestamp,
            other => return Err(format!("unknown info field `{other}`")),
        })
    }
}

/// The value of a single [`InfoField`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfoValue {
    /// See [`InfoField::Name`].
    Name(EntryName),
    /// See [`InfoField::Type`].
    Type(ProbeType),
    /// See [`InfoField::Ref`].
    Ref(Option<ProbeRef>),
    /// See [`InfoField::Options`].
    Options(Options),
    /// See [`InfoField::Cache`].
    Cache(Duration),
    /// See [`InfoField::Status`].
    Status(EntryStatus),
    /// See [`InfoField::Value`].
    Value(Value),
    /// See [`InfoField::Timestamp`].
    Timestamp(u64),
}
