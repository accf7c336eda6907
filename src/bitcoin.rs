//! Bitcoin-family capp library.
//!
//! Covers every application driven like Bitcoin Core: a `*-cli` client and a
//! `*d` daemon sharing a data directory, both taking `-datadir=` and an
//! optional `-conf=`. Forks differ only in which files make up their
//! blockchain data.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::capp::{Capp, CappContext, CappLib};
use crate::config::Config;
use crate::error::CappError;
use crate::flavor::Flavor;
use crate::option::ConfigOption;
use crate::option_type::CanonicalFilePath;
use crate::process::{run_safe, CommandRunner, ProcessOutput, RetryPolicy};
use crate::setup::ConfigSetup;

const BLOCKCHAIN_FILES: &[&str] = &["blocks", "chainstate", "database", "peers.dat", "banlist.dat"];

const DASH_BLOCKCHAIN_FILES: &[&str] = &[
    "blocks",
    "chainstate",
    "database",
    "mncache.dat",
    "peers.dat",
    "mnpayments.dat",
    "banlist.dat",
];

/// A library for one member of the Bitcoin family.
#[derive(Debug, Clone)]
pub struct BitcoinLib {
    name: &'static str,
    blockchain_files: &'static [&'static str],
}

impl BitcoinLib {
    pub fn bitcoin() -> Self {
        Self {
            name: "bitcoin",
            blockchain_files: BLOCKCHAIN_FILES,
        }
    }

    pub fn dash() -> Self {
        Self {
            name: "dash",
            blockchain_files: DASH_BLOCKCHAIN_FILES,
        }
    }

    pub fn blockchain_files(&self) -> &'static [&'static str] {
        self.blockchain_files
    }
}

fn path_option(var_name: &str, key: &str, description: &str) -> ConfigOption {
    ConfigOption::new(var_name)
        .config_key(key)
        .category("paths")
        .short_description(description)
        .option_type(CanonicalFilePath::new())
}

/// What a flavor file for a Bitcoin-family application must define.
pub fn flavor_setup() -> ConfigSetup {
    ConfigSetup::new()
        .option(
            path_option("cli_exec_path", "cli", "The path of the command line interface executable.")
                .enforce_assignment(true),
        )
        .option(
            path_option("daemon_exec_path", "daemon", "The path of the daemon executable.")
                .enforce_assignment(true),
        )
        .option(
            ConfigOption::new("config_file_name")
                .config_key("configfilename")
                .category("names")
                .short_description("The name of the wallet config file.")
                .enforce_assignment(true),
        )
        .option(path_option("data_dir", "datadir", "The path of the datadir.").enforce_assignment(true))
}

/// The flavor schema, plus what only an individual capp file may add.
pub fn capp_setup() -> ConfigSetup {
    flavor_setup().option(path_option(
        "config_file_path",
        "config",
        "The path of the wallet config file.",
    ))
}

impl CappLib for BitcoinLib {
    fn name(&self) -> &str {
        self.name
    }

    fn capp_config_setup(&self) -> ConfigSetup {
        capp_setup()
    }

    fn flavor_config_setup(&self) -> ConfigSetup {
        flavor_setup()
    }

    fn build(&self, ctx: CappContext) -> Result<Box<dyn Capp>, CappError> {
        Ok(Box::new(BitcoinCapp::new(ctx, self.blockchain_files)?))
    }
}

/// One configured Bitcoin-family application.
pub struct BitcoinCapp {
    name: String,
    config: Config,
    flavor: Flavor,
    runner: Arc<dyn CommandRunner>,
    retry: RetryPolicy,
    poll_interval: Duration,
    cli: PathBuf,
    daemon: PathBuf,
    data_dir: PathBuf,
    config_file: Option<PathBuf>,
    blockchain_files: &'static [&'static str],
}

impl BitcoinCapp {
    /// Fails with [`CappError::PathsMissing`] listing every configured path
    /// that doesn't exist.
    pub fn new(ctx: CappContext, blockchain_files: &'static [&'static str]) -> Result<Self, CappError> {
        let config = ctx.config;
        let cli = config.require_path("cli_exec_path")?;
        let daemon = config.require_path("daemon_exec_path")?;
        let data_dir = config.require_path("data_dir")?;
        let config_file = config.path("config_file_path")?;

        let mut checks = vec![
            ("cli-bin path", cli.as_path()),
            ("daemon-bin path", daemon.as_path()),
            ("datadir path", data_dir.as_path()),
        ];
        if let Some(path) = &config_file {
            checks.push(("conf-file path", path.as_path()));
        }
        check_paths(&checks)?;

        Ok(Self {
            name: ctx.name,
            config,
            flavor: ctx.flavor,
            runner: ctx.runner,
            retry: ctx.retry,
            poll_interval: Duration::from_secs(1),
            cli,
            daemon,
            data_dir,
            config_file,
            blockchain_files,
        })
    }

    /// How often [`Capp::stop_daemon`] polls while waiting.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = vec![format!("-datadir={}", self.data_dir.display())];
        if let Some(conf) = &self.config_file {
            args.push(format!("-conf={}", conf.display()));
        }
        args
    }

    /// Full argument list for the CLI.
    pub fn cli_args(&self, args: &[String]) -> Vec<String> {
        let mut full = self.common_args();
        full.extend_from_slice(args);
        full
    }

    /// Full argument list for the daemon, which always detaches.
    pub fn daemon_args(&self, args: &[String]) -> Vec<String> {
        let mut full = vec!["-daemon".to_string()];
        full.extend(self.common_args());
        full.extend_from_slice(args);
        full
    }

    pub fn block_count(&self) -> Result<u64, CappError> {
        let output = self.run_cli_safe(&["getblockcount".to_string()])?;
        output
            .stdout
            .trim()
            .parse()
            .map_err(|_| CappError::InvalidOutput {
                program: self.cli.clone(),
                output: output.stdout.clone(),
            })
    }

    /// Remove one file or directory from the data directory, if present.
    pub fn delete_data_file(&self, name: &str) -> Result<(), CappError> {
        let path = self.data_dir.join(name);
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else if path.exists() {
            fs::remove_file(&path)
        } else {
            return Ok(());
        };
        debug!(path = %path.display(), "deleted data file");
        result.map_err(|e| CappError::IoError { path, source: e })
    }

    pub fn delete_data_files(&self, names: &[&str]) -> Result<(), CappError> {
        names.iter().try_for_each(|name| self.delete_data_file(name))
    }

    /// Remove the downloaded chain, keeping wallets and config.
    pub fn delete_blockchain_data(&self) -> Result<(), CappError> {
        info!(capp = %self.name, dir = %self.data_dir.display(), "deleting blockchain data");
        self.delete_data_files(self.blockchain_files)
    }
}

fn check_paths(checks: &[(&str, &Path)]) -> Result<(), CappError> {
    let missing: Vec<String> = checks
        .iter()
        .filter(|(_, path)| !path.exists())
        .map(|(label, path)| format!("{label}: {}", path.display()))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CappError::PathsMissing(missing))
    }
}

impl Capp for BitcoinCapp {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &Config {
        &self.config
    }

    fn flavor(&self) -> &Flavor {
        &self.flavor
    }

    fn run_cli(&self, args: &[String]) -> Result<ProcessOutput, CappError> {
        self.runner.run(&self.cli, &self.cli_args(args))
    }

    fn run_cli_safe(&self, args: &[String]) -> Result<ProcessOutput, CappError> {
        run_safe(self.runner.as_ref(), &self.cli, &self.cli_args(args), self.retry)
    }

    fn start_daemon(&self, args: &[String]) -> Result<ProcessOutput, CappError> {
        info!(capp = %self.name, "starting daemon");
        self.runner.run(&self.daemon, &self.daemon_args(args))
    }

    /// Polls once per interval for `wait`; returns early once the daemon is
    /// unreachable.
    fn stop_daemon(&self, wait: Option<Duration>) -> Result<ProcessOutput, CappError> {
        info!(capp = %self.name, "stopping daemon");
        let output = self.run_cli_safe(&["stop".to_string()])?;
        let Some(wait) = wait else {
            return Ok(output);
        };

        let polls = match self.poll_interval.as_millis() {
            0 => wait.as_secs().max(1),
            interval => (wait.as_millis() / interval).max(1) as u64,
        };
        for _ in 0..polls {
            match self.block_count() {
                Err(CappError::DaemonUnreachable { .. }) => {
                    debug!(capp = %self.name, "daemon stopped");
                    break;
                }
                Err(e) => return Err(e),
                Ok(_) => std::thread::sleep(self.poll_interval),
            }
        }
        Ok(output)
    }
}
