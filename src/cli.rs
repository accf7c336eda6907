//! Clap adapter for the `cappman` command line.
//!
//! Compiled only with the `clap` feature (on by default). The derive types
//! here parse argv; [`GlobalArgs::arg_source`] is the only bridge into the
//! resolver, turning the parsed global flags into an [`ArgSource`] keyed by
//! the variable names of [`defaults_setup`](crate::capp::defaults_setup).

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use crate::args::ArgSource;

/// Manage crypto application daemons and their command line clients.
#[derive(Debug, Parser)]
#[command(name = "cappman", version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags accepted by every subcommand.
///
/// Field names double as option variable names, so fields without a
/// counterpart in the defaults schema are skipped from serialization.
#[derive(Debug, Args, Serialize)]
pub struct GlobalArgs {
    /// Additional cappman.conf file, read after the discovered ones. Repeatable.
    #[arg(long = "config", value_name = "FILE", global = true)]
    #[serde(skip)]
    pub config_files: Vec<PathBuf>,

    /// Directory holding one config file per managed capp.
    #[arg(long, value_name = "DIR", global = true)]
    pub capp_config_dir: Option<PathBuf>,

    /// Directory searched for plugins before the configured ones. Repeatable.
    #[arg(long = "plugin-dir", value_name = "DIR", global = true)]
    pub plugin_dirs: Vec<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    #[serde(skip)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn arg_source(&self) -> Result<ArgSource, serde_json::Error> {
        ArgSource::from_serialize(self)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every capp in the capp config directory.
    List,
    /// Print the resolved configuration of a capp.
    Show { name: String },
    /// Run the capp's command line client.
    Cli {
        name: String,
        /// Arguments passed through to the client.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Start the capp's daemon.
    Start {
        name: String,
        /// Extra daemon arguments.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Stop the capp's daemon.
    Stop {
        name: String,
        /// Wait up to SECS for the daemon to shut down.
        #[arg(long, value_name = "SECS")]
        wait: Option<u64>,
    },
    /// List the libraries and flavors available in the plugin directories.
    Plugins,
}
