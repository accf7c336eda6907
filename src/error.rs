use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CappError {
    #[error("The following configuration file path was specified but couldn't be found: {}", .path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    ParseError {
        path: PathBuf,
        source: ini::ParseError,
    },

    #[error("Malformed value for '{option}': {reason} (raw value: {value})")]
    Format {
        option: String,
        value: String,
        reason: String,
    },

    #[error(
        "A configuration option isn't properly configured: {reason}\n\
         The option is made up of the following parameters:\n{option}\n\
         Resolved configuration so far:\n{resolved}"
    )]
    OptionUnassigned {
        option: String,
        reason: String,
        resolved: String,
    },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Value of '{key}' is not {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("Plugin '{name}' not found in any of: {}", display_dirs(.dirs))]
    PluginNotFound { name: String, dirs: Vec<PathBuf> },

    #[error("Library plugin '{name}' found at {} but no implementation is registered under that name", .path.display())]
    UnknownLibrary { name: String, path: PathBuf },

    #[error("Attempted to access the {missing} of {plugin} before it was loaded")]
    PluginNotLoaded {
        plugin: String,
        missing: &'static str,
    },

    #[error("Command line capp {} can't connect to the daemon. Is the daemon running?", .program.display())]
    DaemonUnreachable { program: PathBuf },

    #[error("Daemon behind {} still starting up after {attempts} attempts", .program.display())]
    DaemonStuck { program: PathBuf, attempts: u32 },

    #[error("Failed to run {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("Configured paths don't exist:\n{}", .0.join("\n"))]
    PathsMissing(Vec<String>),

    #[error("Unexpected output from {}: {output}", .program.display())]
    InvalidOutput { program: PathBuf, output: String },
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    if dirs.is_empty() {
        return "<no directories>".into();
    }
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
