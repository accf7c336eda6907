//! Value transformers applied to an option's value on assignment.
//!
//! An option carries an ordered pipeline of [`OptionType`]s. Each stage
//! receives the previous stage's output plus the value the option already
//! held in the config being built (the same previous value for every stage).
//!
//! Sequences are transformed element by element, and `Null` passes through
//! untouched unless the stage opts out of [`skip_none`](OptionType::skip_none).

use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde_json::Value;

/// A value a stage could not make sense of.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatError {
    pub value: String,
    pub reason: String,
}

impl FormatError {
    fn new(value: &Value, reason: impl Into<String>) -> Self {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Self {
            value,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (raw value: {})", self.reason, self.value)
    }
}

/// One stage of an option's transform pipeline.
pub trait OptionType: fmt::Debug + Send + Sync {
    /// Short name used in logs and error listings.
    fn name(&self) -> &'static str;

    /// Whether `Null` bypasses [`procedure`](Self::procedure).
    fn skip_none(&self) -> bool {
        true
    }

    /// Transform a single, non-sequence value.
    fn procedure(&self, value: Value, previous: Option<&Value>) -> Result<Value, FormatError>;

    /// Transform `value`, element-wise if it is a sequence.
    fn process(&self, value: Value, previous: Option<&Value>) -> Result<Value, FormatError> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.process_item(item, previous))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => self.process_item(other, previous),
        }
    }

    fn process_item(&self, value: Value, previous: Option<&Value>) -> Result<Value, FormatError> {
        if value.is_null() && self.skip_none() {
            return Ok(value);
        }
        self.procedure(value, previous)
    }
}

/// Expands a leading `~` and lexically normalizes the path.
///
/// `.` segments and repeated separators disappear, `..` pops the preceding
/// segment. Nothing touches the filesystem, so the path need not exist.
#[derive(Debug, Clone)]
pub struct CanonicalFilePath {
    skip_none: bool,
}

impl CanonicalFilePath {
    pub fn new() -> Self {
        Self { skip_none: true }
    }

    pub fn skip_none(mut self, skip: bool) -> Self {
        self.skip_none = skip;
        self
    }
}

impl Default for CanonicalFilePath {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionType for CanonicalFilePath {
    fn name(&self) -> &'static str {
        "canonical file path"
    }

    fn skip_none(&self) -> bool {
        self.skip_none
    }

    fn procedure(&self, value: Value, _previous: Option<&Value>) -> Result<Value, FormatError> {
        let Some(raw) = value.as_str() else {
            return Err(FormatError::new(&value, "expected a file path string"));
        };
        let expanded = expand_home(raw);
        let normalized = normalize(&expanded);
        normalized
            .to_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| FormatError::new(&value, "path is not valid UTF-8"))
    }
}

/// Replace a leading `~` (alone or followed by a separator) with the home directory.
/// `~user` forms and paths without a home directory to expand into are left alone.
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with(std::path::is_separator) => &rest[1..],
        _ => return PathBuf::from(raw),
    };
    match directories::UserDirs::new() {
        Some(user) => user.home_dir().join(rest),
        None => PathBuf::from(raw),
    }
}

/// Lexical normalization, like `os.path.normpath`: the empty path becomes `.`.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Literal syntax a [`TypedList`] decodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFormat {
    /// A JSON array, e.g. `["/a", "/b"]`.
    #[default]
    Json,
}

/// Decodes a serialized list and optionally merges it with the previous value.
///
/// With `merge` on and a list already assigned, the result is
/// `new ++ previous`: entries from the higher-priority source come first.
/// A value that is already a list (e.g. from a CLI parser collecting a
/// repeated flag) is taken as decoded.
#[derive(Debug, Clone)]
pub struct TypedList {
    format: ListFormat,
    merge: bool,
    skip_none: bool,
}

impl TypedList {
    pub fn new() -> Self {
        Self {
            format: ListFormat::Json,
            merge: false,
            skip_none: true,
        }
    }

    pub fn format(mut self, format: ListFormat) -> Self {
        self.format = format;
        self
    }

    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn skip_none(mut self, skip: bool) -> Self {
        self.skip_none = skip;
        self
    }

    fn decode(&self, value: &Value) -> Result<Vec<Value>, FormatError> {
        let Some(raw) = value.as_str() else {
            return Err(FormatError::new(value, "expected a list literal"));
        };
        match self.format {
            ListFormat::Json => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Array(items)) => Ok(items),
                Ok(_) => Err(FormatError::new(value, "JSON value is not an array")),
                Err(e) => Err(FormatError::new(value, format!("invalid JSON list: {e}"))),
            },
        }
    }
}

impl Default for TypedList {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionType for TypedList {
    fn name(&self) -> &'static str {
        "typed list"
    }

    fn skip_none(&self) -> bool {
        self.skip_none
    }

    fn procedure(&self, value: Value, previous: Option<&Value>) -> Result<Value, FormatError> {
        let mut items = match value {
            Value::Array(items) => items,
            other => self.decode(&other)?,
        };
        if self.merge
            && let Some(Value::Array(prev)) = previous
        {
            items.extend(prev.iter().cloned());
        }
        Ok(Value::Array(items))
    }

    // The whole list is one item here, not a sequence to map over.
    fn process(&self, value: Value, previous: Option<&Value>) -> Result<Value, FormatError> {
        self.process_item(value, previous)
    }
}

/// Run `value` through every stage of `pipeline`, in order.
pub fn run_pipeline(
    pipeline: &[std::sync::Arc<dyn OptionType>],
    value: Value,
    previous: Option<&Value>,
) -> Result<Value, FormatError> {
    pipeline
        .iter()
        .try_fold(value, |acc, stage| stage.process(acc, previous))
}
