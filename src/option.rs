//! One configurable field, described across every source it can come from.
//!
//! The variable name is the option's identity and the key it resolves to in
//! a [`Config`](crate::Config). Every other facet is optional: an option
//! without a CLI flag never reads arguments, one without a config key never
//! reads files, and one with neither can only ever hold its default.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::CappError;
use crate::option_type::{self, OptionType};

/// Category used when an option doesn't name one.
pub const DEFAULT_CATEGORY: &str = "main";

/// Custom check run against an option's final value.
pub type Validator = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

/// A failed validation, before the resolver attaches the config dump.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub option: String,
    pub reason: String,
}

/// Descriptor of a single option.
#[derive(Clone)]
pub struct ConfigOption {
    var_name: String,
    arg_long: Option<String>,
    arg_short: Option<char>,
    config_key: Option<String>,
    category: String,
    display_name: Option<String>,
    short_description: Option<String>,
    explanation: Option<String>,
    meta_var: Option<String>,
    default: Value,
    option_types: Vec<Arc<dyn OptionType>>,
    enforce_assignment: bool,
    validator: Option<Validator>,
}

impl ConfigOption {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
            arg_long: None,
            arg_short: None,
            config_key: None,
            category: DEFAULT_CATEGORY.to_string(),
            display_name: None,
            short_description: None,
            explanation: None,
            meta_var: None,
            default: Value::Null,
            option_types: Vec::new(),
            enforce_assignment: false,
            validator: None,
        }
    }

    /// Long command line flag, e.g. `--datadir`.
    pub fn arg(mut self, long: impl Into<String>) -> Self {
        self.arg_long = Some(long.into());
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.arg_short = Some(short);
        self
    }

    /// Key this option is stored under in a config file.
    pub fn config_key(mut self, key: impl Into<String>) -> Self {
        self.config_key = Some(key.into());
        self
    }

    /// Config file section (default: `main`).
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn short_description(mut self, text: impl Into<String>) -> Self {
        self.short_description = Some(text.into());
        self
    }

    pub fn explanation(mut self, text: impl Into<String>) -> Self {
        self.explanation = Some(text.into());
        self
    }

    pub fn meta_var(mut self, meta: impl Into<String>) -> Self {
        self.meta_var = Some(meta.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    /// Append a stage to the transform pipeline.
    pub fn option_type(mut self, stage: impl OptionType + 'static) -> Self {
        self.option_types.push(Arc::new(stage));
        self
    }

    /// Fail resolution if the final value still equals the unprocessed default.
    pub fn enforce_assignment(mut self, enforce: bool) -> Self {
        self.enforce_assignment = enforce;
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validator = Some(Arc::new(check));
        self
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    pub fn arg_long(&self) -> Option<&str> {
        self.arg_long.as_deref()
    }

    pub fn arg_short(&self) -> Option<char> {
        self.arg_short
    }

    pub fn key(&self) -> Option<&str> {
        self.config_key.as_deref()
    }

    pub fn section(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.short_description.as_deref()
    }

    pub fn default(&self) -> &Value {
        &self.default
    }

    pub fn is_enforced(&self) -> bool {
        self.enforce_assignment
    }

    pub fn is_command_line(&self) -> bool {
        self.arg_long.is_some() || self.arg_short.is_some()
    }

    pub fn is_config_file(&self) -> bool {
        self.config_key.is_some()
    }

    /// Run `value` through the pipeline. `previous` is what the option
    /// already holds in the config being built, if anything.
    pub fn process(&self, value: Value, previous: Option<&Value>) -> Result<Value, CappError> {
        option_type::run_pipeline(&self.option_types, value, previous).map_err(|e| {
            CappError::Format {
                option: self.var_name.clone(),
                value: e.value,
                reason: e.reason,
            }
        })
    }

    /// Check the final value: enforced assignment first, then the custom validator.
    pub fn validate(&self, value: &Value) -> Result<(), Violation> {
        if self.enforce_assignment && *value == self.default {
            return Err(Violation {
                option: self.configured_facets(),
                reason: "no source assigned a value other than the default".into(),
            });
        }
        if let Some(check) = &self.validator {
            check(value).map_err(|reason| Violation {
                option: self.configured_facets(),
                reason,
            })?;
        }
        Ok(())
    }

    /// One `- description: value` line per facet that was set, so an operator
    /// can find the option in whichever source it should have come from.
    pub fn configured_facets(&self) -> String {
        let mut lines = vec![format!("- In-code variable name.: {}", self.var_name)];
        let mut push = |label: &str, value: Option<String>| {
            if let Some(v) = value {
                lines.push(format!("- {label}: {v}"));
            }
        };
        push("Command line argument (long).", self.arg_long.clone());
        push("Command line argument (short).", self.arg_short.map(|c| format!("-{c}")));
        push("Name in a configuration file context.", self.config_key.clone());
        push("Fancy name, e.g. for GUIs.", self.display_name.clone());
        push("A short description.", self.short_description.clone());
        push("Syntax variable for help text.", self.meta_var.clone());
        if self.category != DEFAULT_CATEGORY {
            push(
                "Category in a configuration file context.",
                Some(self.category.clone()),
            );
        }
        if !self.default.is_null() {
            push(
                "The default value for this option.",
                Some(crate::config::format_value(&self.default)),
            );
        }
        lines.join("\n")
    }
}

impl fmt::Debug for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigOption")
            .field("var_name", &self.var_name)
            .field("arg_long", &self.arg_long)
            .field("arg_short", &self.arg_short)
            .field("config_key", &self.config_key)
            .field("category", &self.category)
            .field("default", &self.default)
            .field("option_types", &self.option_types)
            .field("enforce_assignment", &self.enforce_assignment)
            .field("validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}
