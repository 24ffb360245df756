// ── LVAP assignment policy ──
//
// Stateless factory for fresh client records and the baseline flow
// rules that bridge a client between the agent's uplink and its LVAP.

use std::net::IpAddr;

use crate::config::LvapConfig;
use crate::model::{Client, FlowMatch, FlowRule, ForwardingProgram, Lvap, MacAddress};

/// Datapath port facing the wired network.
pub const UPLINK_PORT: u16 = 1;
/// Datapath port facing the wireless (LVAP) side.
pub const WIRELESS_PORT: u16 = 2;

const FLOW_PRIORITY: u16 = 200;

/// Policy producing LVAP identities and forwarding programs.
pub trait LvapAssigner: Send + Sync {
    /// A fresh client record for a station seen for the first time, with
    /// no network address yet.
    fn new_lvap_for(&self, mac: MacAddress) -> Client;

    /// Baseline flow rules for a client holding `ip`. Pure function of the address.
    fn default_forwarding_program(&self, ip: IpAddr) -> ForwardingProgram;
}

/// Assigner deriving the BSSID from a fixed prefix and the client's
/// address, with a single configured SSID.
#[derive(Debug, Clone, Default)]
pub struct DefaultLvapAssigner {
    config: LvapConfig,
}

impl DefaultLvapAssigner {
    pub fn new(config: LvapConfig) -> Self {
        Self { config }
    }
}

impl LvapAssigner for DefaultLvapAssigner {
    fn new_lvap_for(&self, mac: MacAddress) -> Client {
        let lvap = Lvap::new(self.config.bssid_for(mac), self.config.ssid.clone());
        Client::new(mac, None, lvap)
    }

    fn default_forwarding_program(&self, ip: IpAddr) -> ForwardingProgram {
        ForwardingProgram {
            rules: vec![
                FlowRule {
                    priority: FLOW_PRIORITY,
                    in_port: UPLINK_PORT,
                    matcher: FlowMatch::DestinationIp(ip),
                    out_port: WIRELESS_PORT,
                    idle_timeout_secs: 0,
                },
                FlowRule {
                    priority: FLOW_PRIORITY,
                    in_port: WIRELESS_PORT,
                    matcher: FlowMatch::SourceIp(ip),
                    out_port: UPLINK_PORT,
                    idle_timeout_secs: 0,
                },
            ],
        }
    }
}
