//! The resolved configuration: a flat map from variable name to value.
//!
//! A [`Config`] carries no schema of its own. The [`ConfigSetup`](crate::ConfigSetup)
//! that produced it knows which names exist and how they were typed; the map
//! just holds the outcome. A config can seed a second resolution, which is how
//! a flavor's options and a library's options end up in one place.
//!
//! Values are `serde_json::Value`s. `Null` is the "absent" marker: an option
//! without a default resolves to `Null` until some source assigns it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::error::CappError;

/// A fully or partially resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    values: BTreeMap<String, Value>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// `true` if `name` is present and not `Null`.
    pub fn is_assigned(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(v) if !v.is_null())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Entries in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// String value of `name`, or `None` if it is absent or `Null`.
    pub fn str(&self, name: &str) -> Result<Option<&str>, CappError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(CappError::WrongType {
                key: name.into(),
                expected: "a string",
            }),
        }
    }

    /// Like [`str`](Self::str), but an absent value is an error.
    pub fn require_str(&self, name: &str) -> Result<&str, CappError> {
        self.str(name)?
            .ok_or_else(|| CappError::KeyNotFound(name.into()))
    }

    pub fn path(&self, name: &str) -> Result<Option<PathBuf>, CappError> {
        Ok(self.str(name)?.map(PathBuf::from))
    }

    pub fn require_path(&self, name: &str) -> Result<PathBuf, CappError> {
        self.require_str(name).map(PathBuf::from)
    }

    pub fn bool(&self, name: &str) -> Result<Option<bool>, CappError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "1" | "yes" | "true" | "on" => Ok(Some(true)),
                "0" | "no" | "false" | "off" => Ok(Some(false)),
                _ => Err(CappError::WrongType {
                    key: name.into(),
                    expected: "a boolean",
                }),
            },
            Some(_) => Err(CappError::WrongType {
                key: name.into(),
                expected: "a boolean",
            }),
        }
    }

    /// List of strings. An absent value is an empty list.
    pub fn strings(&self, name: &str) -> Result<Vec<String>, CappError> {
        let wrong = || CappError::WrongType {
            key: name.into(),
            expected: "a list of strings",
        };
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string).ok_or_else(wrong))
                .collect(),
            Some(_) => Err(wrong()),
        }
    }

    pub fn paths(&self, name: &str) -> Result<Vec<PathBuf>, CappError> {
        Ok(self
            .strings(name)?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    /// `key = value` lines for every entry, in variable-name order.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key} = {}", format_value(value))?;
        }
        Ok(())
    }
}

impl FromIterator<(String, Value)> for Config {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Format a value for display: strings bare, `Null` as `<not set>`, the rest as JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "<not set>".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
