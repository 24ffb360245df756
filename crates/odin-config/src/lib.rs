//! Configuration for the Odin master binary.
//!
//! TOML file + `ODIN_` environment overrides, layered with figment, and
//! translation to `odin_core::MasterConfig`. Also parses the static list
//! of pre-authorized clients loaded before any agent traffic.

mod auth;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use odin_core::{LvapConfig, MacAddress, MasterConfig, MobilityConfig};

pub use auth::{load_authorization_file, parse_authorization};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("{path}:{line}: {reason}")]
    AuthorizationLine {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub master: MasterSection,

    #[serde(default)]
    pub lvap: LvapSection,

    #[serde(default)]
    pub mobility: MobilitySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MasterSection {
    /// UDP address agents send ping/probe/publish datagrams to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// TCP port of each agent's control socket.
    #[serde(default = "default_control_port")]
    pub control_port: u16,

    /// Pre-authorized client list. A missing file is not an error.
    #[serde(default = "default_auth_file")]
    pub auth_file: PathBuf,

    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Seconds of silence after which an agent is dropped.
    #[serde(default = "default_agent_timeout")]
    pub agent_timeout_secs: u64,

    /// How often the stale agent reaper runs.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
}

impl Default for MasterSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            control_port: default_control_port(),
            auth_file: default_auth_file(),
            worker_pool_size: default_worker_pool_size(),
            agent_timeout_secs: default_agent_timeout(),
            reap_interval_secs: default_reap_interval(),
        }
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 2819))
}
fn default_control_port() -> u16 {
    6777
}
fn default_auth_file() -> PathBuf {
    PathBuf::from("odin_authorisation")
}
fn default_worker_pool_size() -> usize {
    10
}
fn default_agent_timeout() -> u64 {
    30
}
fn default_reap_interval() -> u64 {
    5
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LvapSection {
    #[serde(default = "default_ssid")]
    pub ssid: String,

    /// First three octets of generated BSSIDs, e.g. "00:1b:b3".
    #[serde(default = "default_bssid_prefix")]
    pub bssid_prefix: String,
}

impl Default for LvapSection {
    fn default() -> Self {
        Self {
            ssid: default_ssid(),
            bssid_prefix: default_bssid_prefix(),
        }
    }
}

fn default_ssid() -> String {
    "odin".into()
}
fn default_bssid_prefix() -> String {
    "00:1b:b3".into()
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MobilitySection {
    #[serde(default = "default_hysteresis")]
    pub hysteresis_ms: u64,

    #[serde(default = "default_idle_client")]
    pub idle_client_ms: u64,

    #[serde(default = "default_signal_threshold")]
    pub signal_strength_threshold: i64,

    #[serde(default = "default_subscription_threshold")]
    pub subscription_threshold: f64,
}

impl Default for MobilitySection {
    fn default() -> Self {
        Self {
            hysteresis_ms: default_hysteresis(),
            idle_client_ms: default_idle_client(),
            signal_strength_threshold: default_signal_threshold(),
            subscription_threshold: default_subscription_threshold(),
        }
    }
}

fn default_hysteresis() -> u64 {
    2000
}
fn default_idle_client() -> u64 {
    6000
}
fn default_signal_threshold() -> i64 {
    27
}
fn default_subscription_threshold() -> f64 {
    160.0
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "odin", "odin-master").map_or_else(
        || PathBuf::from("odin-master.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from defaults, the TOML file at `path` (or the
/// platform config path), then the environment.
///
/// Environment keys use a double underscore between section and field:
/// `ODIN_MASTER__CONTROL_PORT=7000`.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("ODIN_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Render a config as TOML, e.g. to print the effective settings.
pub fn render_config(cfg: &Config) -> Result<String, ConfigError> {
    Ok(toml::to_string_pretty(cfg)?)
}

// ── Translation ─────────────────────────────────────────────────────

impl Config {
    /// Build the core's runtime configuration, validating what TOML
    /// cannot express.
    pub fn to_master_config(&self) -> Result<MasterConfig, ConfigError> {
        if self.master.worker_pool_size == 0 {
            return Err(ConfigError::Validation {
                field: "master.worker_pool_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        Ok(MasterConfig {
            worker_pool_size: self.master.worker_pool_size,
            agent_timeout: Duration::from_secs(self.master.agent_timeout_secs),
            lvap: LvapConfig {
                ssid: self.lvap.ssid.clone(),
                bssid_prefix: parse_bssid_prefix(&self.lvap.bssid_prefix)?,
            },
            mobility: MobilityConfig {
                hysteresis: Duration::from_millis(self.mobility.hysteresis_ms),
                idle_client: Duration::from_millis(self.mobility.idle_client_ms),
                signal_strength_threshold: self.mobility.signal_strength_threshold,
                subscription_threshold: self.mobility.subscription_threshold,
            },
        })
    }
}

fn parse_bssid_prefix(prefix: &str) -> Result<[u8; 3], ConfigError> {
    let invalid = || ConfigError::Validation {
        field: "lvap.bssid_prefix".into(),
        reason: format!("expected three hex octets like 00:1b:b3, got '{prefix}'"),
    };

    // Pad to a full address so MacAddress does the hex parsing.
    let mac: MacAddress = format!("{prefix}:00:00:00")
        .parse()
        .map_err(|_| invalid())?;
    let [a, b, c, ..] = mac.octets();
    Ok([a, b, c])
}
