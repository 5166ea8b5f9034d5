// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural condition predicates evaluated against occurrence payloads
//!
//! A [`ConditionSet`] is a conjunction of [`Condition`] clauses:
//!   - Equality: `status == "open"` (subset matching over a payload)
//!   - Containment: substring of a string, or element of an array
//!   - Prefix: string starts with a prefix
//!   - Threshold: numeric `above` / `below` / `equal`
//!   - Time field: extract a calendar field from a timestamp and compare
//!
//! An empty set always matches. A missing key or a type mismatch makes that
//! clause false. Evaluation is pure and never mutates its inputs.

use crate::occurrence::Payload;
use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Numeric comparison used by threshold clauses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Above,
    Below,
    Equal,
}

impl Comparison {
    pub fn holds(self, actual: f64, threshold: f64) -> bool {
        match self {
            Comparison::Above => actual > threshold,
            Comparison::Below => actual < threshold,
            Comparison::Equal => approx_eq(actual, threshold),
        }
    }
}

/// Calendar field extracted from a timestamp (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeField {
    Year,
    Month,
    Day,
    /// Monday = 0 through Sunday = 6
    Weekday,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    pub fn extract(self, at: &DateTime<Utc>) -> i64 {
        match self {
            TimeField::Year => i64::from(at.year()),
            TimeField::Month => i64::from(at.month()),
            TimeField::Day => i64::from(at.day()),
            TimeField::Weekday => i64::from(at.weekday().num_days_from_monday()),
            TimeField::Hour => i64::from(at.hour()),
            TimeField::Minute => i64::from(at.minute()),
            TimeField::Second => i64::from(at.second()),
        }
    }
}

/// A single predicate clause over one payload key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    Equals {
        key: String,
        value: Value,
    },
    Contains {
        key: String,
        needle: Value,
    },
    Prefix {
        key: String,
        prefix: String,
    },
    Threshold {
        key: String,
        comparison: Comparison,
        value: f64,
    },
    TimeField {
        key: String,
        field: TimeField,
        value: i64,
    },
}

impl Condition {
    pub fn equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn contains(key: impl Into<String>, needle: impl Into<Value>) -> Self {
        Condition::Contains {
            key: key.into(),
            needle: needle.into(),
        }
    }

    pub fn prefix(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Condition::Prefix {
            key: key.into(),
            prefix: prefix.into(),
        }
    }

    pub fn above(key: impl Into<String>, value: f64) -> Self {
        Self::threshold(key, Comparison::Above, value)
    }

    pub fn below(key: impl Into<String>, value: f64) -> Self {
        Self::threshold(key, Comparison::Below, value)
    }

    pub fn threshold(key: impl Into<String>, comparison: Comparison, value: f64) -> Self {
        Condition::Threshold {
            key: key.into(),
            comparison,
            value,
        }
    }

    pub fn time_field(key: impl Into<String>, field: TimeField, value: i64) -> Self {
        Condition::TimeField {
            key: key.into(),
            field,
            value,
        }
    }

    /// The payload key this clause inspects
    pub fn key(&self) -> &str {
        match self {
            Condition::Equals { key, .. }
            | Condition::Contains { key, .. }
            | Condition::Prefix { key, .. }
            | Condition::Threshold { key, .. }
            | Condition::TimeField { key, .. } => key,
        }
    }

    /// Evaluate this clause against a payload
    pub fn check(&self, payload: &Payload) -> bool {
        let Some(actual) = payload.get(self.key()) else {
            return false;
        };

        match self {
            Condition::Equals { value, .. } => json_eq(actual, value),
            Condition::Contains { needle, .. } => match (actual, needle) {
                (Value::String(hay), Value::String(n)) => hay.contains(n.as_str()),
                (Value::Array(items), n) => items.iter().any(|item| json_eq(item, n)),
                _ => false,
            },
            Condition::Prefix { prefix, .. } => actual
                .as_str()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Condition::Threshold {
                comparison, value, ..
            } => as_number(actual).is_some_and(|n| comparison.holds(n, *value)),
            Condition::TimeField { field, value, .. } => {
                as_timestamp(actual).is_some_and(|at| field.extract(&at) == *value)
            }
        }
    }
}

/// Conjunction of condition clauses; empty always matches
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConditionSet(Vec<Condition>);

impl ConditionSet {
    /// A set with no clauses, which matches every payload
    pub fn always() -> Self {
        Self(Vec::new())
    }

    pub fn new(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }

    /// Equality-set predicate: every pair must be present and equal
    pub fn equal_all<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| Condition::equals(k, v))
                .collect(),
        )
    }

    /// Add a clause (builder style)
    pub fn and(mut self, condition: Condition) -> Self {
        self.0.push(condition);
        self
    }

    pub fn check(&self, payload: &Payload) -> bool {
        self.0.iter().all(|c| c.check(payload))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.0.iter()
    }
}

impl From<Vec<Condition>> for ConditionSet {
    fn from(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// JSON equality where numbers compare by value (`1` equals `1.0`)
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (as_integer(x), as_integer(y)) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => approx_eq(x, y),
                _ => x == y,
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_eq(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_eq(x, y)))
        }
        _ => a == b,
    }
}

/// Integers compare exactly; only floats go through `f64`
fn as_integer(n: &serde_json::Number) -> Option<i128> {
    n.as_i64()
        .map(i128::from)
        .or_else(|| n.as_u64().map(i128::from))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts RFC 3339 strings, or naive ISO 8601 strings interpreted as UTC
fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
