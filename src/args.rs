//! Command line argument sources.
//!
//! The resolver doesn't parse argv. It takes already-parsed arguments as a
//! flat map from variable name to value, and only cares whether a name is
//! assigned. `Null` counts as unassigned, so an `Option<T>` field a parser
//! left empty falls through to the file and default layers.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// One set of parsed arguments, keyed by option variable name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgSource {
    values: BTreeMap<String, Value>,
}

impl ArgSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `name`. A `None`-like value is ignored (useful for optional flags).
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.values.insert(name.to_string(), value);
        }
        self
    }

    pub fn set_opt<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(name, v),
            None => self,
        }
    }

    /// Build a source from any serializable struct or map, e.g. a clap-derived args struct.
    ///
    /// Top-level fields become variable names. Nested structs (clap's
    /// `#[command(flatten)]` groups) contribute their fields under their own
    /// names. `None` fields and empty lists are skipped.
    pub fn from_serialize<S: Serialize>(source: &S) -> Result<Self, serde_json::Error> {
        let mut out = Self::new();
        if let Value::Object(fields) = serde_json::to_value(source)? {
            collect(&mut out.values, fields);
        }
        Ok(out)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn is_assigned(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn collect(out: &mut BTreeMap<String, Value>, fields: serde_json::Map<String, Value>) {
    for (key, value) in fields {
        match value {
            Value::Null => {}
            Value::Array(ref items) if items.is_empty() => {}
            Value::Object(nested) => collect(out, nested),
            other => {
                out.insert(key, other);
            }
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ArgSource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = BTreeMap::new();
        for (k, v) in iter {
            let v = v.into();
            if !v.is_null() {
                values.insert(k.into(), v);
            }
        }
        Self { values }
    }
}
