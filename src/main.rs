//! `cappman`: manage crypto application daemons from per-capp config files.
//!
//! ```sh
//! cappman list
//! cappman show savings
//! cappman start savings
//! cappman cli savings -- getblockchaininfo
//! cappman stop savings --wait 60
//! cappman --plugin-dir ./plugins plugins
//! ```
//!
//! Defaults come from `cappman.conf` in the platform config directory and
//! `~/.cappman/`, then any `--config` files, then the global flags. Set
//! `RUST_LOG` to override the log filter.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cappman::cli::{Cli, Command};
use cappman::{
    list_plugins, Capp, Capps, Defaults, PluginKind, PluginRegistry, ProcessOutput, SystemRunner,
};

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "cappman=info",
        1 => "cappman=debug",
        _ => "cappman=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second subscriber can only come from an embedding test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Echo a child's output and turn its exit status into ours.
fn relay(output: ProcessOutput) -> ExitCode {
    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    match output.status {
        Some(0) => ExitCode::SUCCESS,
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    }
}

fn list(capps: &Capps) -> Result<()> {
    for path in capps.config_files()? {
        match capps.load(&path) {
            Ok(capp) => println!(
                "{:<16} {:<12} {}",
                capp.name(),
                capp.flavor().name(),
                capp.flavor().library()
            ),
            Err(e) => println!("{:<16} <failed to load: {e}>", path.display()),
        }
    }
    Ok(())
}

fn plugins(capps: &Capps) -> Result<()> {
    let dirs = capps.plugin_dirs();
    println!("Libraries:");
    for name in capps.registry().discover(dirs)? {
        println!("  {name}");
    }
    println!("Flavors:");
    for name in list_plugins(dirs, PluginKind::Flavor)? {
        println!("  {name}");
    }
    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    let args = cli.global.arg_source().context("failed to read command line flags")?;
    let defaults = Defaults::load(&Defaults::search_paths(), &cli.global.config_files, &[args])
        .context("failed to resolve cappman configuration")?;
    let capps = Capps::new(&defaults, PluginRegistry::builtin(), Arc::new(SystemRunner));

    let load = |name: &str| -> Result<Box<dyn Capp>> {
        capps.find(name).with_context(|| format!("failed to load capp '{name}'"))
    };

    match cli.command {
        Command::List => list(&capps)?,
        Command::Plugins => plugins(&capps)?,
        Command::Show { name } => println!("{}", load(&name)?.config().dump()),
        Command::Cli { name, args } => return Ok(relay(load(&name)?.run_cli_safe(&args)?)),
        Command::Start { name, args } => return Ok(relay(load(&name)?.start_daemon(&args)?)),
        Command::Stop { name, wait } => {
            let output = load(&name)?.stop_daemon(wait.map(Duration::from_secs))?;
            return Ok(relay(output));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
