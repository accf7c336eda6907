use std::path::PathBuf;

/// Where to look for the application's own config file.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".cappman")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// The kinds of plugin found under a plugin directory, each in its own subfolder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKind {
    /// Capp libraries: code plus the schemas for capp and flavor files.
    Library,
    /// Flavors: config-only plugins naming the library that governs them.
    Flavor,
}

impl PluginKind {
    pub fn subdir(self) -> &'static str {
        match self {
            PluginKind::Library => "capplibs",
            PluginKind::Flavor => "flavors",
        }
    }
}
