//! Master error types with miette diagnostics.

use std::net::SocketAddr;

use miette::Diagnostic;
use thiserror::Error;

use odin_config::ConfigError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const BIND: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum MasterError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration")]
    #[diagnostic(
        code(odin::config),
        help(
            "Check the config file ({path}) and any ODIN_* environment variables.\n\
             Print the effective settings with: odin-master show-config"
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    #[error("Could not load the client authorization list")]
    #[diagnostic(
        code(odin::authorization),
        help("Each line must read `<mac> <ip> <bssid> <ssid>`; lines starting with # are ignored.")
    )]
    Authorization {
        #[source]
        source: ConfigError,
    },

    // ── Network ──────────────────────────────────────────────────────

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(odin::bind),
        help("Another master may already be running, or the port needs elevated privileges.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(odin::io))]
    Io(#[from] std::io::Error),
}

impl MasterError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::Authorization { .. } => exit_code::CONFIG,
            Self::Bind { .. } => exit_code::BIND,
            Self::Io(_) => exit_code::GENERAL,
        }
    }
}
