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

//! # Probekit Core
//!
//! The "common language" of the probe registry: entry names, types, options
//! and values, the error taxonomy, and the contracts of the collaborators the
//! registry delegates to (measurement backends, the definition registry and
//! the value cache).
//!
//! `probekit-registry` provides the concrete registry built on these types.

#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod name;
pub mod options;
pub mod probe;
pub mod value;

pub use self::entry::{
    current_timestamp_ms, DispatchTarget, Entry, EntryStatus, EntryTemplate, ProbeRef, ProbeType,
};
pub use self::error::{RegistryError, RegistryResult};
pub use self::name::EntryName;
pub use self::options::{Options, CACHE_KEY, STATUS_KEY};
pub use self::probe::{
    DefinitionRegistry, ProbeBackend, ProbeContext, ProbeResult, ValueCache,
};
pub use self::value::Value;
