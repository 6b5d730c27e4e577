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

//! The registry error taxonomy.

use crate::entry::ProbeType;
use crate::name::EntryName;
use thiserror::Error;

/// A specialized `Result` type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// An error that can occur within the probe registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The name has no registered entry.
    #[error("entry not found: {0}")]
    NotFound(EntryName),
    /// No definition or backend is known for the type a new entry asked for.
    #[error("no definition for `{name}` of type `{probe_type}`")]
    UnknownType {
        /// The name creation was attempted for.
        name: EntryName,
        /// The unresolvable type.
        probe_type: ProbeType,
    },
    /// The entry exists but the backend serving it is no longer registered.
    #[error("backend `{backend}` serving `{name}` is not registered")]
    BackendUnavailable {
        /// The existing entry.
        name: EntryName,
        /// The dispatch key of the missing backend.
        backend: String,
    },
    /// The name is already registered with a different type.
    #[error("entry `{name}` already exists with type `{existing}`")]
    AlreadyExists {
        /// The conflicting name.
        name: EntryName,
        /// The type it is currently registered with.
        existing: ProbeType,
    },
    /// The entry is disabled and the requested options do not re-enable it.
    #[error("entry `{0}` is disabled")]
    Disabled(EntryName),
    /// An option failed local validation.
    #[error("illegal option `{key}`: {reason}")]
    IllegalOption {
        /// The offending option key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
    /// A value is not acceptable for the entry it was sent to.
    #[error("illegal value for `{name}`: {reason}")]
    IllegalValue {
        /// The entry the value was sent to.
        name: EntryName,
        /// Why it was rejected.
        reason: String,
    },
    /// A query pattern could not be compiled.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    /// The shard store could not be accessed.
    #[error("storage error: {0}")]
    Storage(String),
    /// An error returned by a probe backend, passed through untouched.
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl RegistryError {
    /// Returns `true` for the `not_found` family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RegistryError::NotFound(_) | RegistryError::UnknownType { .. }
        )
    }

    /// Shorthand for an [`RegistryError::IllegalOption`].
    pub fn illegal_option(key: impl Into<String>, reason: impl Into<String>) -> Self {
        RegistryError::IllegalOption {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
