//! Config file discovery and loading.
//!
//! Two entry points, with opposite attitudes to missing files:
//!
//! - [`load_config_files`] reads paths a caller named explicitly. Every one
//!   must exist; a missing path is [`CappError::ConfigFileNotFound`].
//! - [`discover_config_files`] probes [`SearchPath`] candidates for a file
//!   name and returns the ones that exist. Missing files are skipped; listing
//!   a search path is a suggestion, not a requirement.
//!
//! Both return `(path, content)` pairs in the order given, so the resolver
//! can apply them lowest priority first. Only the resolver parses them.

use std::path::PathBuf;

use tracing::debug;

use crate::error::CappError;
use crate::types::SearchPath;

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// `app_name` is used by `SearchPath::Platform` to construct the platform-specific
/// config directory (e.g. `~/.config/{app_name}/` on Linux).
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Candidate file paths `{dir}/{file_name}` for every resolvable search path.
pub fn candidate_paths(search_paths: &[SearchPath], file_name: &str, app_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(file_name))
        .collect()
}

/// Find `file_name` under each search path and return the ones that exist.
pub fn discover_config_files(
    search_paths: &[SearchPath],
    file_name: &str,
    app_name: &str,
) -> Result<Vec<PathBuf>, CappError> {
    let mut found = Vec::new();
    for path in candidate_paths(search_paths, file_name, app_name) {
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => found.push(path),
            Ok(_) => continue,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(CappError::IoError { path, source: e }),
        }
    }
    debug!(?found, "discovered config files");
    Ok(found)
}

/// Read every path in order. All of them must exist.
pub fn load_config_files(paths: &[PathBuf]) -> Result<Vec<(PathBuf, String)>, CappError> {
    let mut results = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(content) => results.push((path.clone(), content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CappError::ConfigFileNotFound { path: path.clone() });
            }
            Err(e) => {
                return Err(CappError::IoError {
                    path: path.clone(),
                    source: e,
                });
            }
        }
    }
    Ok(results)
}
