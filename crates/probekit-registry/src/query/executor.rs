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

//! Evaluation of compiled patterns by a linear scan of the query shard.

use super::compiler::CompiledPattern;
use super::pattern::{Expr, Field, Term};
use crate::storage::ShardStore;
use probekit_core::{Entry, RegistryResult};
use std::cmp::Ordering;
use std::mem::discriminant;
use std::ops::ControlFlow;

impl CompiledPattern {
    /// Returns the projected result if `entry` matches the head and every guard.
    pub fn evaluate(&self, entry: &Entry) -> Option<Term> {
        if !self.head.matches(entry) {
            return None;
        }
        // A guard that cannot be evaluated counts as false.
        if !self
            .guards
            .iter()
            .all(|guard| eval(guard, entry) == Some(Term::Bool(true)))
        {
            return None;
        }
        eval(&self.projection, entry)
    }
}

fn eval(expr: &Expr, entry: &Entry) -> Option<Term> {
    match expr {
        Expr::Var(_) => None,
        Expr::Const(term) => Some(term.clone()),
        Expr::Field(Field::Name) => Some(Term::Name(entry.name.clone())),
        Expr::Field(Field::Type) => Some(Term::Type((&entry.probe_type).into())),
        Expr::Field(Field::Ref) => Some(Term::Ref(entry.probe_ref)),
        Expr::Elem(e, index) => match eval(e, entry)? {
            Term::Tuple(items) => items.into_iter().nth(*index),
            Term::Name(name) => name.segment(*index).map(Term::text),
            _ => None,
        },
        Expr::Len(e) => match eval(e, entry)? {
            Term::Tuple(items) => Some(Term::Int(items.len() as i64)),
            Term::Name(name) => Some(Term::Int(name.len() as i64)),
            Term::Text(s) => Some(Term::Int(s.chars().count() as i64)),
            _ => None,
        },
        Expr::Tuple(es) => es
            .iter()
            .map(|e| eval(e, entry))
            .collect::<Option<Vec<_>>>()
            .map(Term::Tuple),
        Expr::Eq(a, b) => Some(Term::Bool(eval(a, entry)? == eval(b, entry)?)),
        Expr::Ne(a, b) => Some(Term::Bool(eval(a, entry)? != eval(b, entry)?)),
        Expr::Lt(a, b) => compare(a, b, entry).map(|o| Term::Bool(o == Ordering::Less)),
        Expr::Gt(a, b) => compare(a, b, entry).map(|o| Term::Bool(o == Ordering::Greater)),
        Expr::And(es) => {
            for e in es {
                match eval(e, entry)? {
                    Term::Bool(true) => {}
                    Term::Bool(false) => return Some(Term::Bool(false)),
                    _ => return None,
                }
            }
            Some(Term::Bool(true))
        }
        Expr::Or(es) => {
            for e in es {
                match eval(e, entry)? {
                    Term::Bool(true) => return Some(Term::Bool(true)),
                    Term::Bool(false) => {}
                    _ => return None,
                }
            }
            Some(Term::Bool(false))
        }
        Expr::Not(e) => match eval(e, entry)? {
            Term::Bool(b) => Some(Term::Bool(!b)),
            _ => None,
        },
        Expr::StartsWith(e, prefix) => match eval(e, entry)? {
            Term::Name(name) => Some(Term::Bool(name.starts_with(prefix))),
            _ => None,
        },
    }
}

/// Orders two terms of the same kind; mixed kinds are incomparable.
fn compare(a: &Expr, b: &Expr, entry: &Entry) -> Option<Ordering> {
    let (a, b) = (eval(a, entry)?, eval(b, entry)?);
    (discriminant(&a) == discriminant(&b)).then(|| a.cmp(&b))
}

/// Runs the patterns over every entry of the query shard.
///
/// Each row yields at most one result: the projection of the first pattern it
/// matches. Scanning stops once `limit` results are collected. Result order is
/// not specified.
pub fn execute(
    store: &ShardStore,
    patterns: &[CompiledPattern],
    limit: Option<usize>,
) -> RegistryResult<Vec<Term>> {
    let mut results = Vec::new();
    if limit == Some(0) || patterns.is_empty() {
        return Ok(results);
    }
    store.scan(|entry| {
        if let Some(term) = patterns.iter().find_map(|p| p.evaluate(entry)) {
            results.push(term);
            if limit.is_some_and(|max| results.len() >= max) {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    })?;
    Ok(results)
}

/// Counts the rows matched by any of the patterns.
pub fn count(store: &ShardStore, patterns: &[CompiledPattern]) -> RegistryResult<usize> {
    let mut matched = 0;
    store.scan(|entry| {
        if patterns.iter().any(|p| p.evaluate(entry).is_some()) {
            matched += 1;
        }
        ControlFlow::Continue(())
    })?;
    Ok(matched)
}
