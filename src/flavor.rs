//! Two-phase flavor loading.
//!
//! A flavor file names the library that governs it, but only that library
//! knows the full set of options a flavor file may hold. Loading is therefore
//! staged, one type per stage:
//!
//! 1. [`FlavorPlugin::locate`] finds the flavor file in the plugin directories.
//! 2. [`FlavorPlugin::load_initial`] resolves it against a minimal schema
//!    ([`basic_flavor_setup`]) to learn the library name.
//! 3. The caller loads that library and passes its flavor schema to
//!    [`InitialFlavor::load_more`], which re-resolves the same file seeded with
//!    the first pass, producing the complete [`Flavor`].
//!
//! Only a [`Flavor`] exposes the flavor configuration.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::CappError;
use crate::option::ConfigOption;
use crate::plugin::PluginLocator;
use crate::setup::ConfigSetup;
use crate::types::PluginKind;

/// Variable holding the name of the library that governs a flavor.
pub const LIBRARY_VAR: &str = "library";

/// The smallest schema that identifies a flavor's library.
pub fn basic_flavor_setup() -> ConfigSetup {
    ConfigSetup::new()
        .option(
            ConfigOption::new(LIBRARY_VAR)
                .config_key("capplib")
                .short_description("The capp library this flavor is written for.")
                .enforce_assignment(true),
        )
        .option(
            ConfigOption::new("flavor_name")
                .config_key("name")
                .short_description("Human readable name of the flavor."),
        )
}

/// A flavor file that has been found but not read.
#[derive(Debug, Clone, PartialEq)]
pub struct FlavorPlugin {
    name: String,
    path: PathBuf,
}

impl FlavorPlugin {
    /// Find flavor `name` under the `flavors` folder of the plugin directories.
    pub fn locate(plugin_dirs: &[PathBuf], name: &str) -> Result<Self, CappError> {
        let path = PluginLocator::of_kind(plugin_dirs, PluginKind::Flavor, name).resolve_path()?;
        Ok(Self::at(name, path))
    }

    /// A flavor at a known path.
    pub fn at(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Phase one: resolve the flavor file against `minimal`.
    pub fn load_initial(self, minimal: &ConfigSetup) -> Result<InitialFlavor, CappError> {
        let config = minimal.from_files(std::slice::from_ref(&self.path))?;
        let library = config.require_str(LIBRARY_VAR)?.to_string();
        debug!(flavor = %self.name, %library, "flavor names its library");
        Ok(InitialFlavor {
            plugin: self,
            library,
            config,
        })
    }
}

/// A flavor after phase one: its library is known, its config is not complete.
#[derive(Debug, Clone)]
pub struct InitialFlavor {
    plugin: FlavorPlugin,
    library: String,
    config: Config,
}

impl InitialFlavor {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn path(&self) -> &Path {
        self.plugin.path()
    }

    /// Name of the library to load before calling [`load_more`](Self::load_more).
    pub fn library(&self) -> &str {
        &self.library
    }

    /// Phase two: resolve the same file against the library's `full` schema,
    /// keeping everything phase one resolved.
    pub fn load_more(self, full: &ConfigSetup) -> Result<Flavor, CappError> {
        let config = full.get_config(&[], std::slice::from_ref(&self.plugin.path), self.config)?;
        Ok(Flavor {
            plugin: self.plugin,
            library: self.library,
            config,
        })
    }
}

/// A completely loaded flavor.
#[derive(Debug, Clone)]
pub struct Flavor {
    plugin: FlavorPlugin,
    library: String,
    config: Config,
}

impl Flavor {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn path(&self) -> &Path {
        self.plugin.path()
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::write;
    use serde_json::json;
    use tempfile::TempDir;

    const FLAVOR: &str = "[main]\ncapplib = bitcoin\nname = Bitcoin Core\n\
                          [paths]\ncli = /usr/bin/bitcoin-cli\n";

    fn full_setup() -> ConfigSetup {
        ConfigSetup::new()
            .option(ConfigOption::new(LIBRARY_VAR).default_value("redeclared"))
            .option(ConfigOption::new("flavor_name").default_value("redeclared"))
            .option(
                ConfigOption::new("cli_exec_path")
                    .config_key("cli")
                    .category("paths")
                    .enforce_assignment(true),
            )
    }

    fn plugin_dir_with_flavor(content: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        write(&dir.path().join("flavors").join("bitcoin"), content);
        dir
    }

    #[test]
    fn locate_finds_flavor_file() {
        let dir = plugin_dir_with_flavor(FLAVOR);
        let plugin = FlavorPlugin::locate(&[dir.path().into()], "bitcoin").unwrap();
        assert_eq!(plugin.path(), dir.path().join("flavors/bitcoin"));
    }

    #[test]
    fn locate_missing_flavor() {
        let dir = TempDir::new().unwrap();
        let err = FlavorPlugin::locate(&[dir.path().into()], "bitcoin").unwrap_err();
        assert!(matches!(err, CappError::PluginNotFound { .. }));
    }

    #[test]
    fn initial_learns_library() {
        let dir = plugin_dir_with_flavor(FLAVOR);
        let initial = FlavorPlugin::locate(&[dir.path().into()], "bitcoin")
            .unwrap()
            .load_initial(&basic_flavor_setup())
            .unwrap();
        assert_eq!(initial.library(), "bitcoin");
    }

    #[test]
    fn initial_without_library_fails() {
        let dir = plugin_dir_with_flavor("[main]\nname = nameless\n");
        let err = FlavorPlugin::locate(&[dir.path().into()], "bitcoin")
            .unwrap()
            .load_initial(&basic_flavor_setup())
            .unwrap_err();
        assert!(matches!(err, CappError::OptionUnassigned { .. }));
    }

    #[test]
    fn more_keeps_initial_values_despite_redeclared_defaults() {
        let dir = plugin_dir_with_flavor(FLAVOR);
        let flavor = FlavorPlugin::locate(&[dir.path().into()], "bitcoin")
            .unwrap()
            .load_initial(&basic_flavor_setup())
            .unwrap()
            .load_more(&full_setup())
            .unwrap();
        let config = flavor.config();
        assert_eq!(config.get(LIBRARY_VAR), Some(&json!("bitcoin")));
        assert_eq!(config.get("flavor_name"), Some(&json!("Bitcoin Core")));
        assert_eq!(config.get("cli_exec_path"), Some(&json!("/usr/bin/bitcoin-cli")));
        assert_eq!(flavor.library(), "bitcoin");
    }

    #[test]
    fn more_enforces_library_schema() {
        let dir = plugin_dir_with_flavor("[main]\ncapplib = bitcoin\n");
        let err = FlavorPlugin::locate(&[dir.path().into()], "bitcoin")
            .unwrap()
            .load_initial(&basic_flavor_setup())
            .unwrap()
            .load_more(&full_setup())
            .unwrap_err();
        match err {
            CappError::OptionUnassigned { option, resolved, .. } => {
                assert!(option.contains("cli_exec_path"));
                assert!(resolved.contains("library = bitcoin"));
            }
            other => panic!("Expected OptionUnassigned, got {other:?}"),
        }
    }

    #[test]
    fn first_plugin_dir_wins_for_flavors() {
        let user = plugin_dir_with_flavor("[main]\ncapplib = dash\n");
        let system = plugin_dir_with_flavor(FLAVOR);
        let initial = FlavorPlugin::locate(&[user.path().into(), system.path().into()], "bitcoin")
            .unwrap()
            .load_initial(&basic_flavor_setup())
            .unwrap();
        assert_eq!(initial.library(), "dash");
    }
}
