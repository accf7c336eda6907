//! Core resolution pipeline: layer defaults, files and arguments into a config.
//!
//! Operates on pre-loaded data ([`ResolveInput`]) with no I/O, so the whole
//! pipeline is testable with synthetic inputs. Phases run strictly in order:
//!
//! 1. Defaults, through each option's pipeline, for every option the seed
//!    hasn't already assigned
//! 2. Config files, in order, later files overriding earlier ones
//! 3. Argument sources, in order, each overriding the previous
//! 4. Validation in variable-name order, failing on the first violation
//!
//! Every phase hands the option's current value to its pipeline as the
//! previous value, which is what lets merging list types accumulate entries
//! across layers.

use std::collections::BTreeMap;
use std::path::PathBuf;

use ini::{Ini, ParseOption};
use serde_json::Value;
use tracing::{debug, trace};

use crate::args::ArgSource;
use crate::config::Config;
use crate::error::CappError;
use crate::option::ConfigOption;

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Debug, Default)]
pub struct ResolveInput {
    /// File contents in precedence order: first = lowest priority, last = highest.
    pub files: Vec<(PathBuf, String)>,
    /// Parsed argument sources, applied after every file, in order.
    pub arg_sources: Vec<ArgSource>,
    /// Config to build on. Values it already assigns survive the default phase.
    pub seed: Config,
}

/// Resolve `options` against `input`.
pub fn resolve(
    options: &BTreeMap<String, ConfigOption>,
    input: ResolveInput,
) -> Result<Config, CappError> {
    let mut config = input.seed;

    apply_defaults(options, &mut config)?;

    for (path, content) in &input.files {
        let ini = parse_ini(path, content)?;
        apply_file(options, &mut config, &ini)?;
        debug!(path = %path.display(), "applied config file");
    }

    for (i, source) in input.arg_sources.iter().enumerate() {
        apply_args(options, &mut config, source)?;
        debug!(source = i, assigned = source.len(), "applied argument source");
    }

    validate(options, &config)?;
    Ok(config)
}

/// Parse INI text with quote and escape handling off, so values such as
/// JSON list literals reach the option pipeline verbatim.
pub fn parse_ini(path: &std::path::Path, content: &str) -> Result<Ini, CappError> {
    let opt = ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    };
    Ini::load_from_str_opt(content, opt).map_err(|e| CappError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn assign(
    option: &ConfigOption,
    config: &mut Config,
    value: Value,
) -> Result<(), CappError> {
    let previous = config.get(option.var_name()).cloned();
    let processed = option.process(value, previous.as_ref())?;
    trace!(option = option.var_name(), value = %processed, "assigned");
    config.insert(option.var_name(), processed);
    Ok(())
}

fn apply_defaults(
    options: &BTreeMap<String, ConfigOption>,
    config: &mut Config,
) -> Result<(), CappError> {
    for (name, option) in options {
        if config.is_assigned(name) {
            trace!(option = %name, "already resolved by an earlier pass, keeping it");
            continue;
        }
        assign(option, config, option.default().clone())?;
    }
    Ok(())
}

fn apply_file(
    options: &BTreeMap<String, ConfigOption>,
    config: &mut Config,
    ini: &Ini,
) -> Result<(), CappError> {
    for option in options.values() {
        let Some(key) = option.key() else {
            continue;
        };
        let Some(section) = ini.section(Some(option.section())) else {
            continue;
        };
        let raw = section
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.to_string());
        if let Some(raw) = raw {
            assign(option, config, Value::String(raw))?;
        }
    }
    Ok(())
}

fn apply_args(
    options: &BTreeMap<String, ConfigOption>,
    config: &mut Config,
    source: &ArgSource,
) -> Result<(), CappError> {
    for (name, option) in options {
        if !option.is_command_line() {
            continue;
        }
        if let Some(value) = source.get(name) {
            assign(option, config, value.clone())?;
        }
    }
    Ok(())
}

fn validate(options: &BTreeMap<String, ConfigOption>, config: &Config) -> Result<(), CappError> {
    for (name, option) in options {
        let value = config.get(name).unwrap_or(&Value::Null);
        if let Err(violation) = option.validate(value) {
            return Err(CappError::OptionUnassigned {
                option: violation.option,
                reason: violation.reason,
                resolved: config.dump(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{list_options, test_options, TEST_CONFIG};
    use crate::option_type::TypedList;
    use serde_json::json;

    fn file(content: &str) -> (PathBuf, String) {
        ("test.conf".into(), content.into())
    }

    #[test]
    fn defaults_only() {
        let config = resolve(&test_options(), ResolveInput::default()).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testdefaultvalue")));
    }

    #[test]
    fn file_overrides_default() {
        let input = ResolveInput {
            files: vec![file(TEST_CONFIG)],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testconfigvalue")));
    }

    #[test]
    fn argument_overrides_file() {
        let input = ResolveInput {
            files: vec![file(TEST_CONFIG)],
            arg_sources: vec![ArgSource::new().set("test", "testargvalue")],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testargvalue")));
    }

    #[test]
    fn later_file_overrides_earlier() {
        let input = ResolveInput {
            files: vec![
                file("[Test]\ntestconfigkey = first\n"),
                file("[Test]\ntestconfigkey = second\n"),
            ],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("second")));
    }

    #[test]
    fn later_argument_source_wins() {
        let input = ResolveInput {
            arg_sources: vec![
                ArgSource::new().set("test", "a"),
                ArgSource::new().set("test", "b"),
            ],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("b")));
    }

    #[test]
    fn wrong_section_is_ignored() {
        let input = ResolveInput {
            files: vec![file("[main]\ntestconfigkey = elsewhere\n")],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testdefaultvalue")));
    }

    #[test]
    fn keys_match_case_insensitively() {
        let input = ResolveInput {
            files: vec![file("[Test]\nTestConfigKey = loud\n")],
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("loud")));
    }

    #[test]
    fn argument_for_option_without_flag_is_ignored() {
        let mut options = test_options();
        options.insert(
            "file_only".into(),
            ConfigOption::new("file_only").default_value("d"),
        );
        let input = ResolveInput {
            arg_sources: vec![ArgSource::new().set("file_only", "from-argv")],
            ..Default::default()
        };
        let config = resolve(&options, input).unwrap();
        assert_eq!(config.get("file_only"), Some(&json!("d")));
    }

    #[test]
    fn list_merge_puts_argument_entries_first() {
        let input = ResolveInput {
            files: vec![file("[main]\ndirs = [\"/file/a\", \"/file/b\"]\n")],
            arg_sources: vec![ArgSource::new().set("dirs", r#"["/arg"]"#)],
            ..Default::default()
        };
        let config = resolve(&list_options(), input).unwrap();
        assert_eq!(
            config.get("dirs"),
            Some(&json!(["/arg", "/file/a", "/file/b"]))
        );
    }

    #[test]
    fn list_merge_includes_processed_default() {
        let mut options = BTreeMap::new();
        options.insert(
            "dirs".into(),
            ConfigOption::new("dirs")
                .config_key("dirs")
                .default_value(r#"["/builtin"]"#)
                .option_type(TypedList::new().merge(true)),
        );
        let input = ResolveInput {
            files: vec![file("[main]\ndirs = [\"/user\"]\n")],
            ..Default::default()
        };
        let config = resolve(&options, input).unwrap();
        assert_eq!(config.get("dirs"), Some(&json!(["/user", "/builtin"])));
    }

    #[test]
    fn malformed_list_aborts() {
        let input = ResolveInput {
            files: vec![file("[main]\ndirs = [\"/unterminated\n")],
            ..Default::default()
        };
        let err = resolve(&list_options(), input).unwrap_err();
        assert!(matches!(err, CappError::Format { ref option, .. } if option == "dirs"));
    }

    #[test]
    fn seed_values_survive_default_phase() {
        let mut seed = Config::new();
        seed.insert("test", "from-earlier-pass");
        let input = ResolveInput {
            seed,
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("from-earlier-pass")));
    }

    #[test]
    fn seed_null_gets_default() {
        let mut seed = Config::new();
        seed.insert("test", Value::Null);
        let input = ResolveInput {
            seed,
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testdefaultvalue")));
    }

    #[test]
    fn seed_keys_outside_schema_are_kept() {
        let mut seed = Config::new();
        seed.insert("library", "bitcoin");
        let input = ResolveInput {
            seed,
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("library"), Some(&json!("bitcoin")));
    }

    #[test]
    fn file_still_overrides_seed() {
        let mut seed = Config::new();
        seed.insert("test", "seeded");
        let input = ResolveInput {
            files: vec![file(TEST_CONFIG)],
            seed,
            ..Default::default()
        };
        let config = resolve(&test_options(), input).unwrap();
        assert_eq!(config.get("test"), Some(&json!("testconfigvalue")));
    }

    fn enforced_options() -> BTreeMap<String, ConfigOption> {
        let mut options = BTreeMap::new();
        for name in ["b_required", "a_required"] {
            options.insert(
                name.to_string(),
                ConfigOption::new(name)
                    .arg(format!("--{name}"))
                    .config_key(name)
                    .enforce_assignment(true),
            );
        }
        options.insert(
            "plain".into(),
            ConfigOption::new("plain").default_value("p"),
        );
        options
    }

    #[test]
    fn enforced_unassigned_fails_with_dump() {
        let input = ResolveInput {
            arg_sources: vec![ArgSource::new().set("b_required", "set")],
            ..Default::default()
        };
        let err = resolve(&enforced_options(), input).unwrap_err();
        match err {
            CappError::OptionUnassigned {
                option, resolved, ..
            } => {
                assert!(option.contains("a_required"));
                assert!(resolved.contains("b_required = set"));
                assert!(resolved.contains("plain = p"));
            }
            other => panic!("Expected OptionUnassigned, got {other:?}"),
        }
    }

    #[test]
    fn validation_reports_lexicographically_first() {
        let err = resolve(&enforced_options(), ResolveInput::default()).unwrap_err();
        match err {
            CappError::OptionUnassigned { option, .. } => {
                assert!(option.contains("a_required"));
                assert!(!option.contains("b_required"));
            }
            other => panic!("Expected OptionUnassigned, got {other:?}"),
        }
    }

    #[test]
    fn enforced_assigned_by_any_source_succeeds() {
        let input = ResolveInput {
            files: vec![file("[main]\na_required = x\n")],
            arg_sources: vec![ArgSource::new().set("b_required", "y")],
            ..Default::default()
        };
        let config = resolve(&enforced_options(), input).unwrap();
        assert_eq!(config.get("a_required"), Some(&json!("x")));
    }

    #[test]
    fn bad_ini_is_parse_error() {
        let input = ResolveInput {
            files: vec![file("[unterminated\nkey = v\n")],
            ..Default::default()
        };
        let err = resolve(&test_options(), input).unwrap_err();
        assert!(matches!(err, CappError::ParseError { .. }));
    }
}
