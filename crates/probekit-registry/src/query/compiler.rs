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

//! Expansion of shorthand query patterns into closed match specifications.
//!
//! Compilation resolves every variable a selector binds into the field
//! expression it stands for, so the compiled guards and projection only refer
//! to `name`, `type` and `ref` of the row being tested. Repeated variables
//! turn into equality guards.

use super::pattern::{
    Expr, Field, NamePattern, QueryPattern, RefPattern, SegmentPattern, Selector, TypePattern,
    WILDCARD,
};
use probekit_core::{Entry, ProbeRef, ProbeType, RegistryError, RegistryResult};
use std::collections::HashMap;

/// Structural match on the name, with `None` standing for any segment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NameMatch {
    Any,
    Exact(Vec<Option<String>>),
    Prefix(Vec<Option<String>>),
}

impl NameMatch {
    fn matches(&self, segments: &[String]) -> bool {
        let (pattern, exact) = match self {
            NameMatch::Any => return true,
            NameMatch::Exact(p) => (p, true),
            NameMatch::Prefix(p) => (p, false),
        };
        if segments.len() < pattern.len() || (exact && segments.len() != pattern.len()) {
            return false;
        }
        pattern
            .iter()
            .zip(segments)
            .all(|(want, got)| want.as_ref().is_none_or(|w| w == got))
    }
}

/// The structural part of a compiled pattern.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Head {
    pub(crate) name: NameMatch,
    pub(crate) probe_type: Option<ProbeType>,
    pub(crate) probe_ref: Option<Option<ProbeRef>>,
}

impl Head {
    fn any() -> Self {
        Self {
            name: NameMatch::Any,
            probe_type: None,
            probe_ref: None,
        }
    }

    pub(crate) fn matches(&self, entry: &Entry) -> bool {
        self.probe_type.as_ref().is_none_or(|t| *t == entry.probe_type)
            && self.probe_ref.is_none_or(|r| r == entry.probe_ref)
            && self.name.matches(entry.name.segments())
    }
}

/// A fully expanded pattern, ready to be evaluated against store rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPattern {
    pub(crate) head: Head,
    pub(crate) guards: Vec<Expr>,
    pub(crate) projection: Expr,
}

impl CompiledPattern {
    /// The guards after substitution, including those generated for repeated variables.
    pub fn guards(&self) -> &[Expr] {
        &self.guards
    }

    /// The projection after substitution.
    pub fn projection(&self) -> &Expr {
        &self.projection
    }
}

/// The `(name, type, ref)` projection of the current row.
pub fn row_projection() -> Expr {
    Expr::Tuple(vec![
        Expr::Field(Field::Name),
        Expr::Field(Field::Type),
        Expr::Field(Field::Ref),
    ])
}

#[derive(Debug, Default)]
struct Scope {
    bindings: HashMap<String, Expr>,
    constraints: Vec<Expr>,
}

impl Scope {
    fn bind(&mut self, var: &str, expr: Expr) {
        if var == WILDCARD {
            return;
        }
        match self.bindings.get(var) {
            Some(bound) => self.constraints.push(bound.clone().equals(expr)),
            None => {
                self.bindings.insert(var.to_string(), expr);
            }
        }
    }

    fn segments(&mut self, patterns: &[SegmentPattern]) -> Vec<Option<String>> {
        patterns
            .iter()
            .enumerate()
            .map(|(index, pattern)| match pattern {
                SegmentPattern::Any => None,
                SegmentPattern::Literal(s) => Some(s.clone()),
                SegmentPattern::Var(var) => {
                    self.bind(var, Expr::Field(Field::Name).elem(index));
                    None
                }
            })
            .collect()
    }

    fn substitute(&self, expr: &Expr) -> RegistryResult<Expr> {
        let sub = |e: &Expr| self.substitute(e).map(Box::new);
        let all = |es: &[Expr]| es.iter().map(|e| self.substitute(e)).collect::<RegistryResult<Vec<_>>>();
        Ok(match expr {
            Expr::Var(var) => self.bindings.get(var).cloned().ok_or_else(|| {
                RegistryError::InvalidQuery(format!("variable `{var}` is not bound by the selector"))
            })?,
            Expr::Const(_) | Expr::Field(_) => expr.clone(),
            Expr::Elem(e, index) => Expr::Elem(sub(e)?, *index),
            Expr::Len(e) => Expr::Len(sub(e)?),
            Expr::Tuple(es) => Expr::Tuple(all(es)?),
            Expr::Eq(a, b) => Expr::Eq(sub(a)?, sub(b)?),
            Expr::Ne(a, b) => Expr::Ne(sub(a)?, sub(b)?),
            Expr::Lt(a, b) => Expr::Lt(sub(a)?, sub(b)?),
            Expr::Gt(a, b) => Expr::Gt(sub(a)?, sub(b)?),
            Expr::And(es) => Expr::And(all(es)?),
            Expr::Or(es) => Expr::Or(all(es)?),
            Expr::Not(e) => Expr::Not(sub(e)?),
            Expr::StartsWith(e, prefix) => Expr::StartsWith(sub(e)?, prefix.clone()),
        })
    }
}

/// Compiles one pattern.
pub fn compile(pattern: &QueryPattern) -> RegistryResult<CompiledPattern> {
    let mut scope = Scope::default();
    let mut head = Head::any();

    match &pattern.selector {
        Selector::Any => {
            scope.bindings.insert(WILDCARD.to_string(), row_projection());
        }
        Selector::Bind(var) => {
            scope.bindings.insert(var.clone(), row_projection());
        }
        Selector::Triple(name, probe_type, probe_ref) => {
            head.name = match name {
                NamePattern::Any => NameMatch::Any,
                NamePattern::Var(var) => {
                    scope.bind(var, Expr::Field(Field::Name));
                    NameMatch::Any
                }
                NamePattern::Exact(segments) => NameMatch::Exact(scope.segments(segments)),
                NamePattern::Prefix(segments) => NameMatch::Prefix(scope.segments(segments)),
            };
            head.probe_type = match probe_type {
                TypePattern::Any => None,
                TypePattern::Var(var) => {
                    scope.bind(var, Expr::Field(Field::Type));
                    None
                }
                TypePattern::Exact(t) => Some(t.clone()),
            };
            head.probe_ref = match probe_ref {
                RefPattern::Any => None,
                RefPattern::Var(var) => {
                    scope.bind(var, Expr::Field(Field::Ref));
                    None
                }
                RefPattern::Exact(r) => Some(*r),
            };
        }
    }

    let mut guards = std::mem::take(&mut scope.constraints);
    for guard in &pattern.guards {
        guards.push(scope.substitute(guard)?);
    }

    let projection = match pattern.projection.as_slice() {
        [] => row_projection(),
        [single] => scope.substitute(single)?,
        many => Expr::Tuple(
            many.iter()
                .map(|e| scope.substitute(e))
                .collect::<RegistryResult<Vec<_>>>()?,
        ),
    };

    Ok(CompiledPattern {
        head,
        guards,
        projection,
    })
}

/// Compiles a list of patterns, failing on the first invalid one.
pub fn compile_all(patterns: &[QueryPattern]) -> RegistryResult<Vec<CompiledPattern>> {
    patterns.iter().map(compile).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::pattern::Term;

    #[test]
    fn test_wildcard_binds_whole_row() {
        let pattern = QueryPattern::all()
            .with_guard(Expr::var("_").elem(1).equals(Expr::constant(Term::probe_type("counter"))));
        let compiled = compile(&pattern).unwrap();

        assert_eq!(compiled.head, Head::any());
        assert_eq!(
            compiled.guards()[0],
            row_projection()
                .elem(1)
                .equals(Expr::constant(Term::probe_type("counter")))
        );
        assert_eq!(compiled.projection(), &row_projection());
    }

    #[test]
    fn test_bound_symbol_uses_caller_name() {
        let pattern = QueryPattern::new(Selector::Bind("E".into()))
            .with_projection(Expr::var("E").elem(0));
        let compiled = compile(&pattern).unwrap();
        assert_eq!(compiled.projection(), &row_projection().elem(0));
    }

    #[test]
    fn test_triple_variables_become_fields() {
        let pattern = QueryPattern::new(Selector::Triple(
            NamePattern::Prefix(vec![
                SegmentPattern::Literal("http".into()),
                SegmentPattern::Var("Route".into()),
            ]),
            TypePattern::Var("T".into()),
            RefPattern::Any,
        ))
        .with_projection(Expr::var("Route"))
        .with_projection(Expr::var("T"));
        let compiled = compile(&pattern).unwrap();

        assert_eq!(
            compiled.head.name,
            NameMatch::Prefix(vec![Some("http".into()), None])
        );
        assert_eq!(
            compiled.projection(),
            &Expr::Tuple(vec![
                Expr::Field(Field::Name).elem(1),
                Expr::Field(Field::Type),
            ])
        );
    }

    #[test]
    fn test_repeated_variable_adds_equality_guard() {
        let pattern = QueryPattern::new(Selector::Triple(
            NamePattern::Exact(vec![
                SegmentPattern::Var("X".into()),
                SegmentPattern::Var("X".into()),
            ]),
            TypePattern::Any,
            RefPattern::Any,
        ));
        let compiled = compile(&pattern).unwrap();
        assert_eq!(
            compiled.guards(),
            &[Expr::Field(Field::Name)
                .elem(0)
                .equals(Expr::Field(Field::Name).elem(1))]
        );
    }

    #[test]
    fn test_unbound_variable_is_rejected() {
        let pattern = QueryPattern::new(Selector::Bind("E".into())).with_projection(Expr::var("F"));
        assert!(matches!(
            compile(&pattern),
            Err(RegistryError::InvalidQuery(_))
        ));
    }

    #[test]
    fn test_wildcard_var_in_triple_is_not_bound() {
        let pattern = QueryPattern::new(Selector::Triple(
            NamePattern::Var("_".into()),
            TypePattern::Any,
            RefPattern::Any,
        ))
        .with_projection(Expr::var("_"));
        assert!(compile(&pattern).is_err());
    }

    #[test]
    fn test_name_match() {
        let segs = |s: &[&str]| s.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        let prefix = NameMatch::Prefix(vec![Some("a".into()), None]);
        assert!(prefix.matches(&segs(&["a", "b"])));
        assert!(prefix.matches(&segs(&["a", "b", "c"])));
        assert!(!prefix.matches(&segs(&["a"])));
        assert!(!prefix.matches(&segs(&["b", "b"])));

        let exact = NameMatch::Exact(vec![Some("a".into())]);
        assert!(exact.matches(&segs(&["a"])));
        assert!(!exact.matches(&segs(&["a", "b"])));
    }
}
