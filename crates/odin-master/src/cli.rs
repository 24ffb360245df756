//! Clap derive structures for the `odin-master` binary.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// odin-master -- control plane for an Odin software-defined WLAN
#[derive(Debug, Parser)]
#[command(
    name = "odin-master",
    version,
    about = "Run the Odin WLAN master",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', env = "ODIN_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the master and serve agents until interrupted
    Run(RunArgs),

    /// Print the effective configuration as TOML
    ShowConfig,

    /// Validate an authorization list and print its entries
    CheckAuth {
        /// File to check (defaults to the configured auth_file)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// UDP address for agent datagrams (overrides config)
    #[arg(long, short = 'l')]
    pub listen: Option<SocketAddr>,

    /// Agent control port (overrides config)
    #[arg(long)]
    pub control_port: Option<u16>,

    /// Authorization list (overrides config)
    #[arg(long)]
    pub auth_file: Option<PathBuf>,

    /// Do not start the built-in mobility manager
    #[arg(long)]
    pub no_mobility: bool,
}
