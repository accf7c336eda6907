//! Layered INI configuration and plugin loading for crypto application
//! managers.
//!
//! Cappman drives crypto application daemons ("capps") and their command
//! line clients from small INI files. Every file is resolved against a
//! schema, a [`ConfigSetup`] of named [`ConfigOption`]s, into a flat
//! [`Config`] mapping variable names to values.
//!
//! ```ignore
//! let setup = ConfigSetup::new().option(
//!     ConfigOption::new("data_dir")
//!         .arg("--datadir")
//!         .config_key("datadir")
//!         .category("paths")
//!         .option_type(CanonicalFilePath::new())
//!         .enforce_assignment(true),
//! );
//! let config = setup.get_config(&[args], &[PathBuf::from("capp.conf")], Config::new())?;
//! let data_dir = config.require_path("data_dir")?;
//! ```
//!
//! # Layer precedence
//!
//! ```text
//! Seed                 values an earlier resolution already produced
//!        ↑ filled in by
//! Option defaults      only for names the seed leaves unassigned
//!        ↑ overridden by
//! Config files         in the order given, later files win
//!        ↑ overridden by
//! Argument sources     in the order given, later sources win
//! ```
//!
//! Each value is fed through the option's [`OptionType`] pipeline together
//! with what the option held before, which is how list options accumulate
//! across layers instead of replacing each other. Once every layer has been
//! applied, options marked `enforce_assignment` must hold something other
//! than their default, and custom validators run. Any failure aborts the
//! whole resolution with a [`CappError`] that lists the offending option's
//! facets and everything resolved so far.
//!
//! Seeding is what makes schemas composable: resolving a second setup on
//! top of the result of a first keeps every value the first produced,
//! even where the second setup declares the same option with a different
//! default.
//!
//! # Plugins
//!
//! A plugin directory holds two kinds of plugin, each in its own folder:
//!
//! ```text
//! <plugin_dir>/capplibs/<library>   enables a compiled-in CappLib
//! <plugin_dir>/flavors/<flavor>     INI file naming its library
//! ```
//!
//! Plugin directories are searched in order and the first one holding an
//! entry with the exact name wins. Flavors load in two phases (see
//! [`flavor`]): a minimal schema learns which library governs the file,
//! and the library's own schema then re-reads it.
//!
//! # Capps
//!
//! [`Capps`] enumerates the `*.conf` files of the capp config directory.
//! Each names its flavor; loading resolves the flavor, the library, and the
//! capp file itself (seeded with the flavor's values) and asks the library
//! to build a [`Capp`] handle. The Bitcoin family (`bitcoin`, `dash`) ships
//! in [`bitcoin`].
//!
//! The application's own defaults (where the capp files and the plugins
//! live) come from `cappman.conf`, see [`Defaults`].
//!
//! # Logging
//!
//! The library logs through [`tracing`] and never installs a subscriber.
//! The `cappman` binary installs one writing to stderr, filtered by
//! `RUST_LOG`.
//!
//! # Cargo features
//!
//! - `clap` (default): the [`cli`] argument types and the `cappman` binary.

pub mod args;
pub mod bitcoin;
pub mod capp;
pub mod config;
pub mod error;
pub mod flavor;
pub mod option;
pub mod option_type;
pub mod plugin;
pub mod process;
pub mod registry;
pub mod setup;
pub mod types;

#[cfg(feature = "clap")]
pub mod cli;
mod file;
mod resolve;

#[cfg(test)]
mod fixtures;

pub use args::ArgSource;
pub use capp::{Capp, CappContext, CappLib, Capps, Defaults};
pub use config::Config;
pub use error::CappError;
pub use flavor::{Flavor, FlavorPlugin, InitialFlavor};
pub use option::ConfigOption;
pub use option_type::{CanonicalFilePath, ListFormat, OptionType, TypedList};
pub use plugin::{list_plugins, ConfigPlugin, PluginLocator};
pub use process::{CommandRunner, ProcessOutput, RetryPolicy, SystemRunner};
pub use registry::PluginRegistry;
pub use resolve::{resolve, ResolveInput};
pub use setup::ConfigSetup;
pub use types::{PluginKind, SearchPath};
