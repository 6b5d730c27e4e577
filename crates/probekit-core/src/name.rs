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

//! Hierarchical entry names.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The unique, hierarchical key of a registry entry.
///
/// A name is an ordered list of segments, e.g. `["http", "requests", "total"]`.
/// Two names are equal only if every segment is equal, so `["a", "b"]` and
/// `["a.b"]` are distinct entries even though they display the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryName(Vec<String>);

impl EntryName {
    /// Creates a name from any sequence of segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Splits a dotted path (`"db.pool.size"`) into a name.
    pub fn from_dotted(path: &str) -> Self {
        Self::new(path.split('.').filter(|s| !s.is_empty()))
    }

    /// The segments of this name, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Returns the segment at `index`, if any.
    pub fn segment(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    /// The number of segments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the empty (root) name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if the leading segments of `self` equal `prefix`.
    ///
    /// The empty prefix matches every name.
    pub fn starts_with(&self, prefix: &EntryName) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for EntryName {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<&[&str]> for EntryName {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for EntryName {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}

impl From<Vec<String>> for EntryName {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_matching() {
        let name = EntryName::from(["http", "requests", "total"]);

        assert!(name.starts_with(&EntryName::from(["http"])));
        assert!(name.starts_with(&EntryName::from(["http", "requests"])));
        assert!(name.starts_with(&EntryName::new(Vec::<String>::new())));
        assert!(!name.starts_with(&EntryName::from(["https"])));
        assert!(!name.starts_with(&EntryName::from(["http", "requests", "total", "x"])));
    }

    #[test]
    fn test_display_and_dotted_parsing() {
        let name = EntryName::from_dotted("db.pool..size");
        assert_eq!(name.len(), 3);
        assert_eq!(name.segment(2), Some("size"));
        assert_eq!(name.to_string(), "db.pool.size");
    }

    #[test]
    fn test_segments_are_not_flattened() {
        assert_ne!(EntryName::from(["a", "b"]), EntryName::from(["a.b"]));
    }
}
