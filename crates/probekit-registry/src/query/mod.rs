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

//! Pattern queries over the registry.
//!
//! A [`QueryPattern`] is a terse selector plus guards and a projection. It is
//! compiled by [`compile`] into a closed [`CompiledPattern`] and evaluated by
//! [`execute`] against the query shard of a [`ShardStore`].

pub mod compiler;
pub mod executor;
pub mod pattern;

pub use self::compiler::{compile, compile_all, row_projection, CompiledPattern};
pub use self::executor::{count, execute};
pub use self::pattern::{
    Expr, Field, NamePattern, ProbeTypeTerm, QueryPattern, RefPattern, SegmentPattern, Selector,
    Term, TypePattern, WILDCARD,
};

use crate::storage::ShardStore;
use probekit_core::{EntryName, ProbeRef, ProbeType, RegistryResult};
use serde::Serialize;

/// The `(name, type, ref)` projection of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryTriple {
    /// Entry name.
    pub name: EntryName,
    /// Entry type.
    pub probe_type: ProbeType,
    /// Backend handle, if any.
    pub probe_ref: Option<ProbeRef>,
}

/// Compiles and runs `patterns`, returning at most `limit` results.
pub fn select(
    store: &ShardStore,
    patterns: &[QueryPattern],
    limit: Option<usize>,
) -> RegistryResult<Vec<Term>> {
    let compiled = compile_all(patterns)?;
    execute(store, &compiled, limit)
}

/// Lists the entries whose leading segments match `prefix`.
pub fn find_entries(
    store: &ShardStore,
    prefix: Vec<SegmentPattern>,
) -> RegistryResult<Vec<EntryTriple>> {
    let pattern = QueryPattern::new(Selector::Triple(
        NamePattern::Prefix(prefix),
        TypePattern::Any,
        RefPattern::Any,
    ));
    let results = select(store, &[pattern], None)?;
    Ok(results
        .into_iter()
        .filter_map(Term::into_triple)
        .map(|(name, probe_type, probe_ref)| EntryTriple {
            name,
            probe_type,
            probe_ref,
        })
        .collect())
}
