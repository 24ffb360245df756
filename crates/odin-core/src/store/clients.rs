// ── Client registry ──
//
// Every station the master knows about, plus a disjoint side map of
// stations steered off WiFi entirely. Keeping a client in at most one
// of the two maps is the job of the call sites that move it; the
// registry itself never checks.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use super::collection::Collection;
use crate::model::{Client, Lvap, MacAddress};

/// Registry of known clients keyed by hardware address.
///
/// Each operation is individually safe under concurrent use. No pair of
/// calls is atomic: "insert if absent" is the caller's check-then-act.
pub struct ClientRegistry {
    clients: Collection<MacAddress, Client>,
    offloaded: Collection<MacAddress, Client>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            clients: Collection::new(),
            offloaded: Collection::new(),
        }
    }

    /// Insert a client, silently replacing any existing record for the same address.
    pub fn add(&self, client: Arc<Client>) -> Arc<Client> {
        self.clients.insert(client.mac(), Arc::clone(&client));
        client
    }

    /// Insert a client known before any protocol traffic (static authorization list).
    pub fn add_cold_start(&self, mac: MacAddress, ip: IpAddr, lvap: Lvap) -> Arc<Client> {
        self.add(Arc::new(Client::new(mac, Some(ip), lvap)))
    }

    pub fn remove(&self, mac: MacAddress) -> Option<Arc<Client>> {
        self.clients.remove(&mac)
    }

    pub fn get(&self, mac: MacAddress) -> Option<Arc<Client>> {
        self.clients.get(&mac)
    }

    /// Point-in-time copy of all clients.
    pub fn all(&self) -> HashMap<MacAddress, Arc<Client>> {
        self.clients.snapshot()
    }

    /// Clients whose LVAP is currently hosted by the agent at `address`.
    pub fn hosted_by(&self, address: IpAddr) -> Vec<Arc<Client>> {
        self.clients.filter(|client| {
            client
                .agent()
                .is_some_and(|agent| agent.address() == address)
        })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Offloaded clients ────────────────────────────────────────────

    pub fn add_offloaded(&self, client: Arc<Client>) {
        self.offloaded.insert(client.mac(), client);
    }

    pub fn remove_offloaded(&self, mac: MacAddress) -> Option<Arc<Client>> {
        self.offloaded.remove(&mac)
    }

    pub fn get_offloaded(&self, mac: MacAddress) -> Option<Arc<Client>> {
        self.offloaded.get(&mac)
    }

    pub fn all_offloaded(&self) -> HashMap<MacAddress, Arc<Client>> {
        self.offloaded.snapshot()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
