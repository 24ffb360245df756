// ── Forwarding program types ──
//
// The flow rules installed on an agent's datapath so a client's traffic
// is bridged between the wired uplink and the LVAP. The core treats the
// program as an opaque value; the agent link decides how to encode it.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Which side of the packet a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowMatch {
    SourceIp(IpAddr),
    DestinationIp(IpAddr),
}

/// A single flow rule: packets entering on `in_port` that satisfy
/// `matcher` leave through `out_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRule {
    pub priority: u16,
    pub in_port: u16,
    pub matcher: FlowMatch,
    pub out_port: u16,
    /// Seconds of inactivity before the datapath may evict the rule. 0 = never.
    pub idle_timeout_secs: u16,
}

/// The full set of rules to install for one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardingProgram {
    pub rules: Vec<FlowRule>,
}

impl ForwardingProgram {
    /// A program with no rules, used while the client's address is unknown.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
