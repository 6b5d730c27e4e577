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

//! The shorthand selector syntax of registry queries.

use probekit_core::{EntryName, ProbeRef, ProbeType};

/// Name of the placeholder bound by [`Selector::Any`].
pub const WILDCARD: &str = "_";

/// Matches one segment of an entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentPattern {
    /// Any segment.
    Any,
    /// Exactly this segment.
    Literal(String),
    /// Any segment, bound to a variable. Repeating a variable requires the
    /// segments to be equal.
    Var(String),
}

impl SegmentPattern {
    /// Parses `"_"` as [`SegmentPattern::Any`] and anything else as a literal.
    pub fn parse(segment: &str) -> Self {
        if segment == WILDCARD {
            SegmentPattern::Any
        } else {
            SegmentPattern::Literal(segment.to_string())
        }
    }
}

/// Matches the `name` field of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// Any name.
    Any,
    /// Any name, bound to a variable.
    Var(String),
    /// Names with exactly these segments.
    Exact(Vec<SegmentPattern>),
    /// Names whose leading segments match these, followed by anything.
    Prefix(Vec<SegmentPattern>),
}

impl NamePattern {
    /// Prefix pattern of literal segments.
    pub fn prefix(prefix: &EntryName) -> Self {
        NamePattern::Prefix(
            prefix
                .segments()
                .iter()
                .map(|s| SegmentPattern::Literal(s.clone()))
                .collect(),
        )
    }
}

/// Matches the `type` field of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    /// Any type.
    Any,
    /// Any type, bound to a variable.
    Var(String),
    /// Exactly this type.
    Exact(ProbeType),
}

/// Matches the `ref` field of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefPattern {
    /// Any handle, including none.
    Any,
    /// Any handle, bound to a variable.
    Var(String),
    /// Exactly this handle (`None` matches entries without one).
    Exact(Option<ProbeRef>),
}

/// The head of a query pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every entry; the whole `(name, type, ref)` row is bound to [`WILDCARD`].
    Any,
    /// Every entry; the whole row is bound to the given variable.
    Bind(String),
    /// A structural match on the three projected fields.
    Triple(NamePattern, TypePattern, RefPattern),
}

/// A field of the `(name, type, ref)` projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The entry name.
    Name,
    /// The entry type.
    Type,
    /// The backend handle.
    Ref,
}

/// A value produced by evaluating a query expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    /// An entry name.
    Name(EntryName),
    /// An entry type.
    Type(ProbeTypeTerm),
    /// A backend handle, if any.
    Ref(Option<ProbeRef>),
    /// A string, e.g. a single name segment.
    Text(String),
    /// An integer.
    Int(i64),
    /// A boolean.
    Bool(bool),
    /// An ordered group of terms.
    Tuple(Vec<Term>),
}

/// Totally ordered wrapper so types can take part in term comparisons.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProbeTypeTerm(pub String);

impl From<&ProbeType> for ProbeTypeTerm {
    fn from(t: &ProbeType) -> Self {
        ProbeTypeTerm(t.as_str().to_string())
    }
}

impl Term {
    /// A type term.
    pub fn probe_type(t: impl Into<ProbeType>) -> Self {
        Term::Type(ProbeTypeTerm::from(&t.into()))
    }

    /// A text term.
    pub fn text(s: impl Into<String>) -> Self {
        Term::Text(s.into())
    }

    /// Splits a `(name, type, ref)` tuple term into its parts.
    pub fn into_triple(self) -> Option<(EntryName, ProbeType, Option<ProbeRef>)> {
        match self {
            Term::Tuple(items) => match <[Term; 3]>::try_from(items) {
                Ok([Term::Name(name), Term::Type(t), Term::Ref(r)]) => {
                    Some((name, ProbeType::new(t.0), r))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// A guard or projection expression over the projected fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A variable bound by the selector.
    Var(String),
    /// A literal.
    Const(Term),
    /// A projected field of the current row.
    Field(Field),
    /// Element `i` of a tuple, or segment `i` of a name.
    Elem(Box<Expr>, usize),
    /// Arity of a tuple or segment count of a name.
    Len(Box<Expr>),
    /// A tuple of expressions.
    Tuple(Vec<Expr>),
    /// Equality.
    Eq(Box<Expr>, Box<Expr>),
    /// Inequality.
    Ne(Box<Expr>, Box<Expr>),
    /// Strictly less than.
    Lt(Box<Expr>, Box<Expr>),
    /// Strictly greater than.
    Gt(Box<Expr>, Box<Expr>),
    /// All operands are true.
    And(Vec<Expr>),
    /// At least one operand is true.
    Or(Vec<Expr>),
    /// Negation.
    Not(Box<Expr>),
    /// The name operand begins with the given segments.
    StartsWith(Box<Expr>, EntryName),
}

impl Expr {
    /// Refers to a bound variable.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// A literal term.
    pub fn constant(term: Term) -> Self {
        Expr::Const(term)
    }

    /// Element `index` of `self`.
    pub fn elem(self, index: usize) -> Self {
        Expr::Elem(Box::new(self), index)
    }

    /// Arity or segment count of `self`.
    pub fn length(self) -> Self {
        Expr::Len(Box::new(self))
    }

    /// `self == other`.
    pub fn equals(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    /// `self != other`.
    pub fn not_equals(self, other: Expr) -> Self {
        Expr::Ne(Box::new(self), Box::new(other))
    }

    /// `self < other`.
    pub fn less_than(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    /// `self > other`.
    pub fn greater_than(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    /// Negation of `self`.
    pub fn negate(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// `self` is a name beginning with `prefix`.
    pub fn starts_with(self, prefix: impl Into<EntryName>) -> Self {
        Expr::StartsWith(Box::new(self), prefix.into())
    }
}

/// A selector with its guards and projection.
///
/// Guards and projection are written in terms of the variables the selector
/// binds. An empty projection yields the `(name, type, ref)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPattern {
    /// What rows to consider and which variables to bind.
    pub selector: Selector,
    /// Conditions that must all evaluate to `true`.
    pub guards: Vec<Expr>,
    /// What to return for a matching row.
    pub projection: Vec<Expr>,
}

impl QueryPattern {
    /// A pattern with no guards and the default projection.
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            guards: Vec::new(),
            projection: Vec::new(),
        }
    }

    /// Matches every entry.
    pub fn all() -> Self {
        Self::new(Selector::Any)
    }

    /// Adds a guard.
    pub fn with_guard(mut self, guard: Expr) -> Self {
        self.guards.push(guard);
        self
    }

    /// Adds a projection expression.
    pub fn with_projection(mut self, expr: Expr) -> Self {
        self.projection.push(expr);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_parsing() {
        assert_eq!(SegmentPattern::parse("_"), SegmentPattern::Any);
        assert_eq!(
            SegmentPattern::parse("http"),
            SegmentPattern::Literal("http".into())
        );
    }

    #[test]
    fn test_triple_term_roundtrip() {
        let term = Term::Tuple(vec![
            Term::Name(EntryName::from(["a"])),
            Term::probe_type("counter"),
            Term::Ref(None),
        ]);
        let (name, probe_type, probe_ref) = term.into_triple().unwrap();
        assert_eq!(name, EntryName::from(["a"]));
        assert!(probe_type.is_counter());
        assert_eq!(probe_ref, None);

        assert!(Term::Int(1).into_triple().is_none());
    }
}
