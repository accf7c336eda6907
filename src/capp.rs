//! Capps: managed crypto applications and the schemas that bootstrap them.
//!
//! Loading one capp from its config file walks the whole chain:
//!
//! ```text
//! capp file ──basic_capp_setup──▶ flavor name
//! flavor file ──basic_flavor_setup──▶ library name
//! registry ──▶ CappLib
//! flavor file ──lib.flavor_config_setup (seeded)──▶ Flavor
//! capp file ──lib.capp_config_setup (seeded with flavor)──▶ capp Config
//! lib.build(config, flavor) ──▶ Box<dyn Capp>
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::args::ArgSource;
use crate::config::Config;
use crate::error::CappError;
use crate::file;
use crate::flavor::{basic_flavor_setup, Flavor, FlavorPlugin};
use crate::option::ConfigOption;
use crate::option_type::{CanonicalFilePath, TypedList};
use crate::plugin::ConfigPlugin;
use crate::process::{CommandRunner, ProcessOutput, RetryPolicy};
use crate::registry::PluginRegistry;
use crate::setup::ConfigSetup;
use crate::types::SearchPath;

/// Application name, used for the platform config directory.
pub const APP_NAME: &str = "cappman";

/// File name of the application's own config file.
pub const CONFIG_FILE_NAME: &str = "cappman.conf";

/// Extension of per-capp config files in the capp config directory.
pub const CAPP_FILE_EXTENSION: &str = "conf";

/// A running handle on one managed application.
pub trait Capp: Send + Sync {
    /// Name the capp file gives this instance.
    fn name(&self) -> &str;

    fn config(&self) -> &Config;

    fn flavor(&self) -> &Flavor;

    /// Run the command line client once.
    fn run_cli(&self, args: &[String]) -> Result<ProcessOutput, CappError>;

    /// Run the command line client, honoring the daemon retry contract.
    fn run_cli_safe(&self, args: &[String]) -> Result<ProcessOutput, CappError>;

    fn start_daemon(&self, args: &[String]) -> Result<ProcessOutput, CappError>;

    /// Ask the daemon to stop, then optionally wait until it is unreachable.
    fn stop_daemon(&self, wait: Option<Duration>) -> Result<ProcessOutput, CappError>;
}

/// Everything a library needs to construct a capp.
pub struct CappContext {
    pub name: String,
    pub config: Config,
    pub flavor: Flavor,
    pub runner: Arc<dyn CommandRunner>,
    pub retry: RetryPolicy,
}

/// A capp library: the code plugin behind a family of flavors.
pub trait CappLib: Send + Sync {
    fn name(&self) -> &str;

    /// Schema of the per-capp config file.
    fn capp_config_setup(&self) -> ConfigSetup;

    /// Schema of the flavor files written for this library.
    fn flavor_config_setup(&self) -> ConfigSetup;

    fn build(&self, ctx: CappContext) -> Result<Box<dyn Capp>, CappError>;
}

/// Schema of the application's own config file.
pub fn defaults_setup() -> ConfigSetup {
    ConfigSetup::new()
        .option(
            ConfigOption::new("capp_config_dir")
                .arg("--capp-config-dir")
                .config_key("cappconfigdir")
                .meta_var("DIR")
                .short_description("Directory holding one config file per managed capp.")
                .option_type(CanonicalFilePath::new())
                .enforce_assignment(true),
        )
        .option(
            ConfigOption::new("plugin_dirs")
                .arg("--plugin-dir")
                .config_key("plugindirs")
                .meta_var("DIR")
                .short_description("Directories searched for plugins, first match wins.")
                .option_type(TypedList::new().merge(true))
                .option_type(CanonicalFilePath::new()),
        )
}

/// Schema every capp file shares, whatever its library.
pub fn basic_capp_setup() -> ConfigSetup {
    ConfigSetup::new()
        .option(
            ConfigOption::new("capp_flavor")
                .config_key("cappflavor")
                .short_description("The flavor this capp is an instance of.")
                .enforce_assignment(true),
        )
        .option(
            ConfigOption::new("name")
                .config_key("name")
                .short_description("Name of this capp."),
        )
}

/// Resolved application defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub capp_config_dir: PathBuf,
    pub plugin_dirs: Vec<PathBuf>,
}

impl Defaults {
    /// Search paths for `cappman.conf`, lowest priority first.
    pub fn search_paths() -> Vec<SearchPath> {
        vec![SearchPath::Platform, SearchPath::Home(".cappman")]
    }

    /// Resolve defaults from discovered config files, then `explicit` files
    /// (which must exist), then `args`.
    pub fn load(
        search_paths: &[SearchPath],
        explicit: &[PathBuf],
        args: &[ArgSource],
    ) -> Result<Self, CappError> {
        let mut files = file::discover_config_files(search_paths, CONFIG_FILE_NAME, APP_NAME)?;
        files.extend(explicit.iter().cloned());
        let config = defaults_setup().get_config(args, &files, Config::new())?;
        Self::from_config(&config)
    }

    pub fn from_config(config: &Config) -> Result<Self, CappError> {
        Ok(Self {
            capp_config_dir: config.require_path("capp_config_dir")?,
            plugin_dirs: config.paths("plugin_dirs")?,
        })
    }
}

/// The collection of capps defined in a capp config directory.
pub struct Capps {
    config_dir: PathBuf,
    plugin_dirs: Vec<PathBuf>,
    registry: PluginRegistry,
    runner: Arc<dyn CommandRunner>,
    retry: RetryPolicy,
}

impl Capps {
    pub fn new(
        defaults: &Defaults,
        registry: PluginRegistry,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            config_dir: defaults.capp_config_dir.clone(),
            plugin_dirs: defaults.plugin_dirs.clone(),
            registry,
            runner,
            retry: RetryPolicy::default(),
        }
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn plugin_dirs(&self) -> &[PathBuf] {
        &self.plugin_dirs
    }

    /// Every `*.conf` file in the capp config directory, sorted by path.
    pub fn config_files(&self) -> Result<Vec<PathBuf>, CappError> {
        let io_err = |e| CappError::IoError {
            path: self.config_dir.clone(),
            source: e,
        };
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.config_dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(CAPP_FILE_EXTENSION)
            {
                files.push(path);
            }
        }
        files.sort();
        debug!(dir = %self.config_dir.display(), count = files.len(), "found capp files");
        Ok(files)
    }

    /// Load one capp from its config file.
    pub fn load(&self, path: &Path) -> Result<Box<dyn Capp>, CappError> {
        let basic = basic_capp_setup().from_files(&[path.to_path_buf()])?;
        let flavor_name = basic.require_str("capp_flavor")?;
        let name = capp_name(&basic, path)?;

        let initial = FlavorPlugin::locate(&self.plugin_dirs, flavor_name)?
            .load_initial(&basic_flavor_setup())?;
        let lib = self.registry.load(&self.plugin_dirs, initial.library())?;
        let flavor = initial.load_more(&lib.flavor_config_setup())?;

        let mut plugin = ConfigPlugin::new(path);
        plugin.set_setup(lib.capp_config_setup().extend(basic_capp_setup()));
        plugin.load(flavor.config().clone())?;
        let config = plugin.into_config()?;

        info!(capp = %name, flavor = flavor.name(), library = lib.name(), "loaded capp");
        lib.build(CappContext {
            name,
            config,
            flavor,
            runner: Arc::clone(&self.runner),
            retry: self.retry,
        })
    }

    /// Load every capp in the directory, failing on the first broken one.
    pub fn load_all(&self) -> Result<Vec<Box<dyn Capp>>, CappError> {
        self.config_files()?
            .iter()
            .map(|path| self.load(path))
            .collect()
    }

    /// Find a capp by the name its file declares, or by file stem.
    pub fn find(&self, name: &str) -> Result<Box<dyn Capp>, CappError> {
        for path in self.config_files()? {
            let basic = basic_capp_setup().get_config(&[], &[path.clone()], Config::new());
            let declared = match &basic {
                Ok(config) => capp_name(config, &path)?,
                Err(_) => file_stem(&path),
            };
            if declared == name || file_stem(&path) == name {
                return self.load(&path);
            }
        }
        Err(CappError::KeyNotFound(format!("capp '{name}'")))
    }
}

fn capp_name(basic: &Config, path: &Path) -> Result<String, CappError> {
    Ok(match basic.str("name")? {
        Some(name) => name.to_string(),
        None => file_stem(path),
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
