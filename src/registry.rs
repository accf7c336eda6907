//! Capp library registry.
//!
//! Library implementations are compiled in and registered by name. A library
//! is only usable when a plugin directory also enables it with an entry in
//! its `capplibs` folder, so the on-disk plugin layout decides what a given
//! installation offers.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::bitcoin::BitcoinLib;
use crate::capp::CappLib;
use crate::error::CappError;
use crate::plugin::{list_plugins, PluginLocator};
use crate::types::PluginKind;

#[derive(Clone, Default)]
pub struct PluginRegistry {
    libs: BTreeMap<String, Arc<dyn CappLib>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every library shipped with this crate.
    pub fn builtin() -> Self {
        Self::new()
            .with(BitcoinLib::bitcoin())
            .with(BitcoinLib::dash())
    }

    /// Register `lib`, replacing any library of the same name.
    pub fn register(&mut self, lib: Arc<dyn CappLib>) {
        self.libs.insert(lib.name().to_string(), lib);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, lib: impl CappLib + 'static) -> Self {
        self.register(Arc::new(lib));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CappLib>> {
        self.libs.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.libs.keys().map(String::as_str)
    }

    /// Load library `name`: locate its entry in the plugin directories, then
    /// hand out the registered implementation.
    pub fn load(&self, plugin_dirs: &[PathBuf], name: &str) -> Result<Arc<dyn CappLib>, CappError> {
        let path = PluginLocator::of_kind(plugin_dirs, PluginKind::Library, name).resolve_path()?;
        debug!(library = name, path = %path.display(), "loading capp library");
        self.get(name).ok_or_else(|| CappError::UnknownLibrary {
            name: name.to_string(),
            path,
        })
    }

    /// Libraries enabled in the plugin directories that have an implementation.
    pub fn discover(&self, plugin_dirs: &[PathBuf]) -> Result<Vec<String>, CappError> {
        Ok(list_plugins(plugin_dirs, PluginKind::Library)?
            .into_iter()
            .filter(|name| self.libs.contains_key(name))
            .collect())
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("libs", &self.libs.keys().collect::<Vec<_>>())
            .finish()
    }
}
