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

//! Values read from and written to entries.

use serde::{Deserialize, Serialize};

/// A value read from, or written to, a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// A whole number; the only kind the native counter accepts.
    Integer(i64),
    /// A floating point measurement.
    Float(f64),
    /// Named data points reported by a backend (e.g. `("mean", 1.5)`).
    DataPoints(Vec<(String, f64)>),
    /// The entry exists but cannot currently produce a value.
    Unavailable,
}

impl Value {
    /// Returns the value as an `i64` if it is an `Integer`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is a scalar.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Looks up a named data point.
    pub fn data_point(&self, key: &str) -> Option<f64> {
        match self {
            Value::DataPoints(points) => points.iter().find(|(k, _)| k == key).map(|(_, v)| *v),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Unavailable`].
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Value::Unavailable)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
