use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::args::ArgSource;
use crate::config::Config;
use crate::error::CappError;
use crate::file;
use crate::option::ConfigOption;
use crate::resolve::{self, ResolveInput};

/// A schema of [`ConfigOption`]s plus the logic to resolve them.
///
/// Options are keyed by variable name and kept in name order, which is also
/// the order validation runs in. A setup may own config-file paths of its
/// own; those are read before any paths passed to [`get_config`](Self::get_config).
#[derive(Debug, Clone, Default)]
pub struct ConfigSetup {
    options: BTreeMap<String, ConfigOption>,
    config_file_paths: Vec<PathBuf>,
}

impl ConfigSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config files this setup always consults, lowest priority first.
    pub fn with_config_files(mut self, paths: Vec<PathBuf>) -> Self {
        self.config_file_paths = paths;
        self
    }

    /// Register an option. An option with the same variable name is replaced.
    pub fn add_option(&mut self, option: ConfigOption) {
        let name = option.var_name().to_string();
        if self.options.insert(name.clone(), option).is_some() {
            warn!(option = %name, "option registered twice, keeping the last one");
        }
    }

    /// Builder-style [`add_option`](Self::add_option).
    pub fn option(mut self, option: ConfigOption) -> Self {
        self.add_option(option);
        self
    }

    /// Register every option of `other` on top of this setup's.
    pub fn extend(mut self, other: ConfigSetup) -> Self {
        for option in other.options.into_values() {
            self.add_option(option);
        }
        self.config_file_paths.extend(other.config_file_paths);
        self
    }

    pub fn get(&self, var_name: &str) -> Option<&ConfigOption> {
        self.options.get(var_name)
    }

    pub fn options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn config_file_paths(&self) -> &[PathBuf] {
        &self.config_file_paths
    }

    /// Options reachable from the command line.
    pub fn command_line_options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values().filter(|o| o.is_command_line())
    }

    /// Options reachable from config files.
    pub fn config_file_options(&self) -> impl Iterator<Item = &ConfigOption> {
        self.options.values().filter(|o| o.is_config_file())
    }

    /// Resolve a config from defaults, then `config_file_paths`, then `arg_sources`.
    ///
    /// Values already assigned in `seed` are not reset to this setup's defaults,
    /// which lets a second setup layer its options onto an earlier result.
    /// Every config file must exist. Any failure aborts the whole resolution.
    pub fn get_config(
        &self,
        arg_sources: &[ArgSource],
        config_file_paths: &[PathBuf],
        seed: Config,
    ) -> Result<Config, CappError> {
        let paths: Vec<PathBuf> = self
            .config_file_paths
            .iter()
            .chain(config_file_paths)
            .cloned()
            .collect();
        debug!(options = self.options.len(), files = ?paths, "resolving config");

        let files = file::load_config_files(&paths)?;
        resolve::resolve(
            &self.options,
            ResolveInput {
                files,
                arg_sources: arg_sources.to_vec(),
                seed,
            },
        )
    }

    /// Defaults only (plus any files the setup owns).
    pub fn defaults(&self) -> Result<Config, CappError> {
        self.get_config(&[], &[], Config::new())
    }

    /// Resolve from config files only.
    pub fn from_files(&self, config_file_paths: &[PathBuf]) -> Result<Config, CappError> {
        self.get_config(&[], config_file_paths, Config::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{test_setup, write_test_config};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn arg_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write_test_config(&dir);
        let args = ArgSource::new().set("test", "testargvalue");
        let config = test_setup()
            .get_config(&[args], &[path], Config::new())
            .unwrap();
        assert_eq!(config.str("test").unwrap(), Some("testargvalue"));
    }

    #[test]
    fn arg_absence_uses_file() {
        let dir = TempDir::new().unwrap();
        let path = write_test_config(&dir);
        let config = test_setup().get_config(&[], &[path], Config::new()).unwrap();
        assert_eq!(config.str("test").unwrap(), Some("testconfigvalue"));
    }

    #[test]
    fn all_absence_uses_default() {
        let config = test_setup().defaults().unwrap();
        assert_eq!(config.str("test").unwrap(), Some("testdefaultvalue"));
    }

    #[test]
    fn missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.conf");
        let err = test_setup().from_files(&[missing]).unwrap_err();
        assert!(matches!(err, CappError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn owned_paths_come_before_call_paths() {
        let dir = TempDir::new().unwrap();
        let owned = dir.path().join("owned.conf");
        let call = dir.path().join("call.conf");
        fs::write(&owned, "[Test]\ntestconfigkey = owned\n").unwrap();
        fs::write(&call, "[Test]\ntestconfigkey = call\n").unwrap();

        let setup = test_setup().with_config_files(vec![owned.clone()]);
        assert_eq!(setup.defaults().unwrap().str("test").unwrap(), Some("owned"));
        assert_eq!(
            setup.from_files(&[call]).unwrap().str("test").unwrap(),
            Some("call")
        );
    }

    #[test]
    fn duplicate_option_replaces() {
        let setup = ConfigSetup::new()
            .option(ConfigOption::new("x").default_value("first"))
            .option(ConfigOption::new("x").default_value("second"));
        assert_eq!(setup.len(), 1);
        assert_eq!(setup.defaults().unwrap().get("x"), Some(&json!("second")));
    }

    #[test]
    fn source_views() {
        let setup = ConfigSetup::new()
            .option(ConfigOption::new("argv").arg("--argv"))
            .option(ConfigOption::new("file").config_key("file"))
            .option(ConfigOption::new("both").arg("--both").config_key("both"))
            .option(ConfigOption::new("neither"));
        let cli: Vec<_> = setup.command_line_options().map(|o| o.var_name()).collect();
        let files: Vec<_> = setup.config_file_options().map(|o| o.var_name()).collect();
        assert_eq!(cli, vec!["argv", "both"]);
        assert_eq!(files, vec!["both", "file"]);
    }

    #[test]
    fn layering_two_setups_on_one_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("flavor");
        fs::write(&path, "[main]\ncapplib = bitcoin\n[paths]\ndatadir = /data\n").unwrap();

        let minimal = ConfigSetup::new().option(
            ConfigOption::new("library")
                .config_key("capplib")
                .enforce_assignment(true),
        );
        let full = ConfigSetup::new()
            .option(ConfigOption::new("library").default_value("fallback"))
            .option(
                ConfigOption::new("data_dir")
                    .config_key("datadir")
                    .category("paths"),
            );

        let first = minimal.from_files(&[path.clone()]).unwrap();
        let second = full.get_config(&[], &[path], first).unwrap();
        assert_eq!(second.str("library").unwrap(), Some("bitcoin"));
        assert_eq!(second.str("data_dir").unwrap(), Some("/data"));
    }

    #[test]
    fn calling_twice_rereads_file() {
        let dir = TempDir::new().unwrap();
        let path = write_test_config(&dir);
        let setup = test_setup();
        assert_eq!(
            setup.from_files(&[path.clone()]).unwrap().str("test").unwrap(),
            Some("testconfigvalue")
        );
        fs::write(&path, "[Test]\ntestconfigkey = changed\n").unwrap();
        assert_eq!(
            setup.from_files(&[path]).unwrap().str("test").unwrap(),
            Some("changed")
        );
    }

    #[test]
    fn extend_merges_options() {
        let base = ConfigSetup::new().option(ConfigOption::new("a"));
        let more = ConfigSetup::new().option(ConfigOption::new("b"));
        let merged = base.extend(more);
        assert!(merged.get("a").is_some());
        assert!(merged.get("b").is_some());
    }
}
