//! Finding plugins on disk.
//!
//! A plugin is referenced by name plus an ordered list of base directories.
//! [`PluginLocator::resolve`] returns the first directory, in list order,
//! whose listing contains an entry with exactly that name. Later directories
//! are never consulted once one matches. Directories that don't exist are
//! skipped, so user-provided search paths may be optional.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::CappError;
use crate::setup::ConfigSetup;
use crate::types::PluginKind;

/// A named plugin and the directories it may live in.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginLocator {
    dirs: Vec<PathBuf>,
    name: String,
    subdir: Option<String>,
}

impl PluginLocator {
    pub fn new(dirs: Vec<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            dirs,
            name: name.into(),
            subdir: None,
        }
    }

    /// Look in `{plugin_dir}/{kind subfolder}` of each plugin directory.
    pub fn of_kind(plugin_dirs: &[PathBuf], kind: PluginKind, name: impl Into<String>) -> Self {
        Self::new(plugin_dirs.to_vec(), name).subdir(kind.subdir())
    }

    /// Join a fixed subdirectory onto every base directory.
    pub fn subdir(mut self, subdir: impl Into<String>) -> Self {
        self.subdir = Some(subdir.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directories that will be searched, in order.
    pub fn search_dirs(&self) -> Vec<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| match &self.subdir {
                Some(sub) => dir.join(sub),
                None => dir.clone(),
            })
            .collect()
    }

    /// The first search directory containing an entry named like the plugin.
    pub fn resolve(&self) -> Result<PathBuf, CappError> {
        let dirs = self.search_dirs();
        for dir in &dirs {
            if contains_entry(dir, &self.name)? {
                debug!(plugin = %self.name, dir = %dir.display(), "located plugin");
                return Ok(dir.clone());
            }
        }
        Err(CappError::PluginNotFound {
            name: self.name.clone(),
            dirs,
        })
    }

    /// Full path of the plugin entry itself.
    pub fn resolve_path(&self) -> Result<PathBuf, CappError> {
        Ok(self.resolve()?.join(&self.name))
    }
}

fn contains_entry(dir: &Path, name: &str) -> Result<bool, CappError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ) =>
        {
            return Ok(false);
        }
        Err(e) => {
            return Err(CappError::IoError {
                path: dir.to_path_buf(),
                source: e,
            });
        }
    };
    for entry in entries {
        let entry = entry.map_err(|e| CappError::IoError {
            path: dir.to_path_buf(),
            source: e,
        })?;
        if entry.file_name() == name {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Names of every entry across the search directories, first occurrence wins.
pub fn list_plugins(plugin_dirs: &[PathBuf], kind: PluginKind) -> Result<Vec<String>, CappError> {
    let mut names: Vec<String> = Vec::new();
    for dir in plugin_dirs.iter().map(|d| d.join(kind.subdir())) {
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(CappError::IoError { path: dir, source: e }),
        };
        for entry in entries {
            let entry = entry.map_err(|e| CappError::IoError {
                path: dir.clone(),
                source: e,
            })?;
            if let Some(name) = entry.file_name().to_str()
                && !names.iter().any(|n| n == name)
            {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// A data-only plugin: one config file resolved against a [`ConfigSetup`].
///
/// Nothing about it is usable until the setup has been provided and
/// [`load`](Self::load) has run; the accessors fail with
/// [`CappError::PluginNotLoaded`] before then.
#[derive(Debug, Clone)]
pub struct ConfigPlugin {
    path: PathBuf,
    setup: Option<ConfigSetup>,
    config: Option<Config>,
}

impl ConfigPlugin {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            setup: None,
            config: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_setup(&mut self, setup: ConfigSetup) {
        self.setup = Some(setup);
    }

    pub fn setup(&self) -> Result<&ConfigSetup, CappError> {
        self.setup.as_ref().ok_or_else(|| self.not_loaded("config setup"))
    }

    pub fn config(&self) -> Result<&Config, CappError> {
        self.config.as_ref().ok_or_else(|| self.not_loaded("config"))
    }

    pub fn is_loaded(&self) -> bool {
        self.config.is_some()
    }

    /// Resolve the plugin's file against its setup, on top of `seed`.
    pub fn load(&mut self, seed: Config) -> Result<&Config, CappError> {
        let config = self
            .setup()?
            .get_config(&[], std::slice::from_ref(&self.path), seed)?;
        Ok(self.config.insert(config))
    }

    pub fn into_config(self) -> Result<Config, CappError> {
        let plugin = format!("config plugin {}", self.path.display());
        self.config.ok_or(CappError::PluginNotLoaded {
            plugin,
            missing: "config",
        })
    }

    fn not_loaded(&self, missing: &'static str) -> CappError {
        CappError::PluginNotLoaded {
            plugin: format!("config plugin {}", self.path.display()),
            missing,
        }
    }
}
