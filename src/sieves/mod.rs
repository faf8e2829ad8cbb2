//! # Sieves
//!
//! Boolean rules over document payloads. Chutes use a sieve to decide
//! whether a document goes to their distillery; watchdog triggers use one to
//! decide whether a document raises an alert.

use std::cmp::Ordering;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::documents::lookup_path;

/// How rule results combine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logic {
    #[default]
    All,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
    Exists,
    GreaterThan,
    LessThan,
}

/// One comparison against a dotted field path
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(skip)]
    compiled: OnceLock<Option<Regex>>,
}

impl FieldRule {
    pub fn new(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            compiled: OnceLock::new(),
        }
    }

    pub fn is_match(&self, data: &Value) -> bool {
        let found = lookup_path(data, &self.field).filter(|v| !v.is_null());

        match self.operator {
            Operator::Exists => {
                let wanted = self.value.as_bool().unwrap_or(true);
                found.is_some() == wanted
            }
            Operator::NotEquals => found.map_or(true, |v| !values_equal(v, &self.value)),
            _ => found.is_some_and(|v| self.compare(v)),
        }
    }

    fn compare(&self, found: &Value) -> bool {
        match self.operator {
            Operator::Equals => values_equal(found, &self.value),
            Operator::Contains => match (found, &self.value) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::Array(items), needle) => items.iter().any(|i| values_equal(i, needle)),
                _ => false,
            },
            Operator::StartsWith => str_pair(found, &self.value).is_some_and(|(s, p)| s.starts_with(p)),
            Operator::EndsWith => str_pair(found, &self.value).is_some_and(|(s, p)| s.ends_with(p)),
            Operator::Regex => match (found.as_str(), self.regex()) {
                (Some(s), Some(re)) => re.is_match(s),
                _ => false,
            },
            Operator::GreaterThan => compare_values(found, &self.value) == Some(Ordering::Greater),
            Operator::LessThan => compare_values(found, &self.value) == Some(Ordering::Less),
            Operator::Exists | Operator::NotEquals => false,
        }
    }

    fn regex(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| self.value.as_str().and_then(|p| Regex::new(p).ok()))
            .as_ref()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.field.trim().is_empty() {
            return Err("rule field must not be empty".to_string());
        }
        match self.operator {
            Operator::Regex => {
                let pattern = self
                    .value
                    .as_str()
                    .ok_or_else(|| format!("regex rule on '{}' needs a string pattern", self.field))?;
                Regex::new(pattern)
                    .map(|_| ())
                    .map_err(|e| format!("invalid regex for '{}': {e}", self.field))
            }
            Operator::StartsWith | Operator::EndsWith if !self.value.is_string() => Err(format!(
                "{:?} rule on '{}' needs a string value",
                self.operator, self.field
            )),
            Operator::GreaterThan | Operator::LessThan
                if !(self.value.is_number() || self.value.is_string()) =>
            {
                Err(format!(
                    "{:?} rule on '{}' needs a number or string value",
                    self.operator, self.field
                ))
            }
            _ => Ok(()),
        }
    }
}

impl PartialEq for FieldRule {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.operator == other.operator && self.value == other.value
    }
}

/// A set of rules combined with `all` or `any`, optionally negated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sieve {
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub rules: Vec<FieldRule>,
    #[serde(default)]
    pub negate: bool,
}

impl Sieve {
    pub fn all(rules: Vec<FieldRule>) -> Self {
        Self {
            logic: Logic::All,
            rules,
            negate: false,
        }
    }

    pub fn any(rules: Vec<FieldRule>) -> Self {
        Self {
            logic: Logic::Any,
            rules,
            negate: false,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }

    pub fn is_match(&self, data: &Value) -> bool {
        let matched = match self.logic {
            Logic::All => self.rules.iter().all(|r| r.is_match(data)),
            Logic::Any => self.rules.iter().any(|r| r.is_match(data)),
        };
        matched != self.negate
    }

    pub fn validate(&self) -> Result<(), String> {
        self.rules.iter().try_for_each(FieldRule::validate)
    }
}

fn str_pair<'a>(found: &'a Value, wanted: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((found.as_str()?, wanted.as_str()?))
}

fn values_equal(found: &Value, wanted: &Value) -> bool {
    match (found, wanted) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        // "42" in a payload matches a numeric rule value
        (Value::String(s), Value::Number(n)) => s.parse::<f64>().ok() == n.as_f64(),
        _ => found == wanted,
    }
}

fn compare_values(found: &Value, wanted: &Value) -> Option<Ordering> {
    match (as_number(found), as_number(wanted)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (found.as_str(), wanted.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}
