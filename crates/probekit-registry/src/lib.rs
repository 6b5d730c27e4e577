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

//! # Probekit Registry
//!
//! A concurrent, in-memory catalogue mapping hierarchical names to typed
//! measurement probes.
//!
//! Entries live in a [`ShardStore`](storage::ShardStore): every shard holds the
//! same metadata, while counter increments land on the calling thread's shard
//! only and reads sum across shards. Non-counter entries are served by a
//! [`ProbeBackend`](probekit_core::ProbeBackend) looked up by key, with reads
//! optionally going through a TTL cache. Entries can be discovered by name
//! prefix or with compiled [query patterns](query).

#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod counter;
pub mod definitions;
pub mod dispatch;
pub mod info;
pub mod query;
pub mod registry;
pub mod storage;

pub use self::cache::TtlCache;
pub use self::config::{DefaultsConfig, RegistryConfig, TypeConfig};
pub use self::definitions::StaticDefinitions;
pub use self::dispatch::BackendTable;
pub use self::info::{EntryInfo, InfoField, InfoValue};
pub use self::query::{EntryTriple, QueryPattern, SegmentPattern, Term};
pub use self::registry::ProbeRegistry;
pub use self::storage::ShardStore;
