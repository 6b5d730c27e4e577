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

//! Ordered entry options with last-write-wins merging.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as OptionValue;

/// Option key holding the cache TTL in milliseconds.
pub const CACHE_KEY: &str = "cache";
/// Option key holding the entry status (`"enabled"` or `"disabled"`).
pub const STATUS_KEY: &str = "status";

/// An ordered mapping of option keys to values.
///
/// Keys are unique. Iteration follows insertion order, and [`Options::merge`]
/// keeps the original position of a key that gets overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(IndexMap<String, OptionValue>);

impl Options {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Builder-style insert, returning the updated set.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts or overwrites a single option.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up an option by key.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    /// Returns `true` if the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Merges `other` into `self`; keys from `other` win.
    pub fn merge(&mut self, other: &Options) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Returns a new set holding `self` overlaid with `other`.
    pub fn merged(&self, other: &Options) -> Options {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Iterates over options in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of options.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for Options {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
