// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Filter and update language over JSON documents.
//!
//! Paths are dotted (`progress.0.completed_goals`); numeric segments index
//! arrays. A `$` segment in an update path refers to the element matched by
//! the first [`Condition::ElemMatch`] of the filter.

use serde_json::{Map, Value};

/// Positional path segment.
pub const POSITIONAL: &str = "$";

/// A single filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Value at path equals the given value (a missing path equals `null`).
    Eq(String, Value),
    /// Array at path has an element matching the sub-filter.
    ElemMatch(String, Filter),
    /// Array at path contains the given value.
    Contains(String, Value),
    /// Path is present and not `null` (or the inverse).
    Exists(String, bool),
    Not(Box<Condition>),
}

/// Conjunction of conditions. An empty filter matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(path.into(), value.into()));
        self
    }

    pub fn elem_match(mut self, path: impl Into<String>, filter: Filter) -> Self {
        self.conditions
            .push(Condition::ElemMatch(path.into(), filter));
        self
    }

    pub fn contains(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Contains(path.into(), value.into()));
        self
    }

    pub fn exists(mut self, path: impl Into<String>, present: bool) -> Self {
        self.conditions.push(Condition::Exists(path.into(), present));
        self
    }

    pub fn not(mut self, condition: Condition) -> Self {
        self.conditions.push(Condition::Not(Box::new(condition)));
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Top-level equality conditions as `(path, value)` pairs.
    pub fn equalities(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().filter_map(|c| match c {
            Condition::Eq(path, value) => Some((path.as_str(), value)),
            _ => None,
        })
    }

    /// Canonicalise id-shaped values so they compare equal to stored ids.
    pub fn to_native(&self) -> Filter {
        Filter {
            conditions: self.conditions.iter().map(native_condition).collect(),
        }
    }

    /// Evaluate the filter against a document.
    ///
    /// Returns `None` if the document does not match, otherwise the positional
    /// index captured by the first element match (if any).
    pub fn evaluate(&self, doc: &Value) -> Option<Option<usize>> {
        let mut positional = None;
        for condition in &self.conditions {
            let matched = evaluate_condition(condition, doc)?;
            if positional.is_none() {
                positional = matched;
            }
        }
        Some(positional)
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.evaluate(doc).is_some()
    }
}

fn native_condition(condition: &Condition) -> Condition {
    match condition {
        Condition::Eq(p, v) => Condition::Eq(p.clone(), super::to_native_id(v)),
        Condition::ElemMatch(p, f) => Condition::ElemMatch(p.clone(), f.to_native()),
        Condition::Contains(p, v) => Condition::Contains(p.clone(), super::to_native_id(v)),
        Condition::Exists(p, b) => Condition::Exists(p.clone(), *b),
        Condition::Not(c) => Condition::Not(Box::new(native_condition(c))),
    }
}

/// `None` = no match; `Some(pos)` = match with optional element index.
fn evaluate_condition(condition: &Condition, doc: &Value) -> Option<Option<usize>> {
    match condition {
        Condition::Eq(path, expected) => {
            let actual = get_path(doc, path).unwrap_or(&Value::Null);
            (actual == expected).then_some(None)
        }
        Condition::ElemMatch(path, filter) => {
            let items = get_path(doc, path)?.as_array()?;
            items
                .iter()
                .position(|item| filter.matches(item))
                .map(Some)
        }
        Condition::Contains(path, value) => {
            let items = get_path(doc, path)?.as_array()?;
            items.contains(value).then_some(None)
        }
        Condition::Exists(path, present) => {
            let found = get_path(doc, path).is_some_and(|v| !v.is_null());
            (found == *present).then_some(None)
        }
        Condition::Not(inner) => match evaluate_condition(inner, doc) {
            Some(_) => None,
            None => Some(None),
        },
    }
}

/// Look up a dotted path.
pub fn get_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// A single update operator.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(String, Value),
    /// Append to the array at path, creating it if absent.
    Push(String, Value),
    /// Remove every array element matching the filter.
    Pull(String, Filter),
}

impl UpdateOp {
    /// Path the operator writes to, before positional resolution.
    pub fn path(&self) -> &str {
        match self {
            UpdateOp::Set(path, _) | UpdateOp::Push(path, _) | UpdateOp::Pull(path, _) => path,
        }
    }
}

/// Ordered list of update operators applied to one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    ops: Vec<UpdateOp>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Set(path.into(), value.into()));
        self
    }

    pub fn push(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.ops.push(UpdateOp::Push(path.into(), value.into()));
        self
    }

    pub fn pull(mut self, path: impl Into<String>, filter: Filter) -> Self {
        self.ops.push(UpdateOp::Pull(path.into(), filter));
        self
    }

    pub fn ops(&self) -> &[UpdateOp] {
        &self.ops
    }

    /// Apply every operator in order.
    ///
    /// `positional` is the index captured by the filter, substituted for `$`.
    /// On error the document may be partially modified; callers apply to a copy.
    pub fn apply(&self, doc: &mut Value, positional: Option<usize>) -> Result<(), String> {
        for op in &self.ops {
            match op {
                UpdateOp::Set(path, value) => {
                    let segments = resolve_segments(path, positional)?;
                    *slot_mut(doc, &segments)? = value.clone();
                }
                UpdateOp::Push(path, value) => {
                    let segments = resolve_segments(path, positional)?;
                    let slot = slot_mut(doc, &segments)?;
                    if slot.is_null() {
                        *slot = Value::Array(vec![value.clone()]);
                    } else if let Some(items) = slot.as_array_mut() {
                        items.push(value.clone());
                    } else {
                        return Err(format!("Cannot push onto non-array at '{}'", path));
                    }
                }
                UpdateOp::Pull(path, filter) => {
                    let segments = resolve_segments(path, positional)?;
                    let slot = slot_mut(doc, &segments)?;
                    if let Some(items) = slot.as_array_mut() {
                        items.retain(|item| !filter.matches(item));
                    } else if !slot.is_null() {
                        return Err(format!("Cannot pull from non-array at '{}'", path));
                    }
                }
            }
        }
        Ok(())
    }
}

fn resolve_segments(path: &str, positional: Option<usize>) -> Result<Vec<String>, String> {
    path.split('.')
        .map(|segment| {
            if segment == POSITIONAL {
                positional
                    .map(|i| i.to_string())
                    .ok_or_else(|| format!("Positional path '{}' without element match", path))
            } else {
                Ok(segment.to_string())
            }
        })
        .collect()
}

/// Walk to the slot at `segments`, creating intermediate objects as needed.
fn slot_mut<'a>(mut current: &'a mut Value, segments: &[String]) -> Result<&'a mut Value, String> {
    for segment in segments {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            Value::Array(items) => {
                let index: usize = segment
                    .parse()
                    .map_err(|_| format!("Non-numeric index '{}' into array", segment))?;
                items
                    .get_mut(index)
                    .ok_or_else(|| format!("Index {} out of bounds", index))?
            }
            _ => return Err(format!("Cannot descend into scalar at '{}'", segment)),
        };
    }
    Ok(current)
}
