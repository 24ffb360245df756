// ── Client domain types ──

use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use super::agent::Agent;
use super::forwarding::ForwardingProgram;
use super::mac::MacAddress;

/// A virtual access point identity dedicated to one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lvap {
    /// BSSID the client sees, identical on whichever agent hosts it.
    pub bssid: MacAddress,
    /// SSIDs the LVAP beacons and answers probes for.
    pub ssids: Vec<String>,
}

impl Lvap {
    pub fn new(bssid: MacAddress, ssid: impl Into<String>) -> Self {
        Self {
            bssid,
            ssids: vec![ssid.into()],
        }
    }
}

/// One pre-authorized station, as loaded from the authorization list
/// before any protocol traffic arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedClient {
    pub mac: MacAddress,
    pub ip: IpAddr,
    pub bssid: MacAddress,
    pub ssid: String,
}

struct ClientState {
    ip: Option<IpAddr>,
    lvap: Lvap,
    agent: Option<Arc<Agent>>,
    program: Arc<ForwardingProgram>,
}

/// A station known to the master.
///
/// The hardware address is immutable. Everything else is updated in
/// place by the handoff coordinator and the address snooper, so the
/// registry hands out shared `Arc<Client>` references.
pub struct Client {
    mac: MacAddress,
    state: RwLock<ClientState>,
}

impl Client {
    pub fn new(mac: MacAddress, ip: Option<IpAddr>, lvap: Lvap) -> Self {
        Self {
            mac,
            state: RwLock::new(ClientState {
                ip,
                lvap,
                agent: None,
                program: Arc::new(ForwardingProgram::empty()),
            }),
        }
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.read().ip
    }

    pub fn set_ip(&self, ip: Option<IpAddr>) {
        self.write().ip = ip;
    }

    pub fn lvap(&self) -> Lvap {
        self.read().lvap.clone()
    }

    /// The agent currently hosting this client's LVAP, if any.
    pub fn agent(&self) -> Option<Arc<Agent>> {
        self.read().agent.clone()
    }

    pub fn set_agent(&self, agent: Option<Arc<Agent>>) {
        self.write().agent = agent;
    }

    /// Clear the hosting agent only if it is still the agent at `address`.
    /// Returns `true` when the client was detached.
    pub fn detach_from(&self, address: IpAddr) -> bool {
        let mut state = self.write();
        let hosted_here = state
            .agent
            .as_ref()
            .is_some_and(|agent| agent.address() == address);
        if hosted_here {
            state.agent = None;
        }
        hosted_here
    }

    pub fn forwarding_program(&self) -> Arc<ForwardingProgram> {
        Arc::clone(&self.read().program)
    }

    pub fn set_forwarding_program(&self, program: ForwardingProgram) {
        self.write().program = Arc::new(program);
    }

    // ── Private helpers ──────────────────────────────────────────────

    // A panic while holding the lock cannot leave a field half-written,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("Client")
            .field("mac", &self.mac)
            .field("ip", &state.ip)
            .field("lvap", &state.lvap)
            .field("agent", &state.agent.as_ref().map(|a| a.address()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{RecordingLink, agent_with, mac};

    fn client() -> Client {
        Client::new(
            mac("aa:aa:aa:aa:aa:aa"),
            None,
            Lvap::new(mac("00:1b:b3:aa:aa:aa"), "odin"),
        )
    }

    #[test]
    fn new_client_is_unassigned_with_empty_program() {
        let c = client();
        assert!(c.agent().is_none());
        assert!(c.ip().is_none());
        assert!(c.forwarding_program().is_empty());
    }

    #[test]
    fn detach_only_from_current_host() {
        let c = client();
        c.set_agent(Some(agent_with("10.0.0.1", Arc::new(RecordingLink::default()))));

        assert!(!c.detach_from("10.0.0.2".parse().unwrap()));
        assert!(c.agent().is_some());

        assert!(c.detach_from("10.0.0.1".parse().unwrap()));
        assert!(c.agent().is_none());
    }
}
