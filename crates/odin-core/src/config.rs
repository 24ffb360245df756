// ── Runtime master configuration ──
//
// These types describe how the master behaves: pool sizing, liveness,
// LVAP naming, and the mobility tunables. They never touch disk; the
// host binary builds a `MasterConfig` and hands it in.

use std::time::Duration;

use crate::model::MacAddress;

/// Tunables for the reference mobility policy.
#[derive(Debug, Clone, PartialEq)]
pub struct MobilityConfig {
    /// Minimum dwell time after a handoff before a move to a different
    /// agent is considered.
    pub hysteresis: Duration,
    /// Silence on the hosting agent after which the client is treated as
    /// out of range and moved to whichever agent hears it next.
    pub idle_client: Duration,
    /// Margin (device units) by which a foreign agent's reading must beat
    /// the incumbent's before a handoff.
    pub signal_strength_threshold: i64,
    /// Threshold of the `signal > N` subscription the policy registers.
    pub subscription_threshold: f64,
}

impl Default for MobilityConfig {
    fn default() -> Self {
        Self {
            hysteresis: Duration::from_millis(2000),
            idle_client: Duration::from_millis(6000),
            signal_strength_threshold: 27,
            subscription_threshold: 160.0,
        }
    }
}

/// How fresh LVAPs are named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LvapConfig {
    /// SSID every generated LVAP advertises.
    pub ssid: String,
    /// First three octets of generated BSSIDs; the last three come from
    /// the client's own address.
    pub bssid_prefix: [u8; 3],
}

impl Default for LvapConfig {
    fn default() -> Self {
        Self {
            ssid: "odin".into(),
            bssid_prefix: [0x00, 0x1b, 0xb3],
        }
    }
}

impl LvapConfig {
    /// BSSID for `client`'s LVAP.
    pub fn bssid_for(&self, client: MacAddress) -> MacAddress {
        let [p0, p1, p2] = self.bssid_prefix;
        let [.., c3, c4, c5] = client.octets();
        MacAddress::from_octets([p0, p1, p2, c3, c4, c5])
    }
}

/// Configuration for a single master instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterConfig {
    /// Upper bound on concurrently running asynchronous handoff sub-tasks.
    pub worker_pool_size: usize,
    /// Agents silent for longer than this are dropped by the reaper.
    pub agent_timeout: Duration,
    pub lvap: LvapConfig,
    pub mobility: MobilityConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 10,
            agent_timeout: Duration::from_secs(30),
            lvap: LvapConfig::default(),
            mobility: MobilityConfig::default(),
        }
    }
}
