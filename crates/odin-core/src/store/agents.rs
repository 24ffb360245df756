// ── Agent registry ──
//
// Liveness and identity of every physical agent the master has heard
// from. Entries are created by pings and removed when the transport
// reports the agent gone (or the reaper finds it silent too long).

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::collection::Collection;
use crate::link::AgentConnector;
use crate::model::Agent;

/// Registry of tracked agents keyed by network address.
pub struct AgentRegistry {
    agents: Collection<IpAddr, Agent>,
    connector: Arc<dyn AgentConnector>,
}

impl AgentRegistry {
    pub fn new(connector: Arc<dyn AgentConnector>) -> Self {
        Self {
            agents: Collection::new(),
            connector,
        }
    }

    /// Record a ping from `address`.
    ///
    /// Returns `true` when the agent was not tracked before this ping (first
    /// contact, or first contact since it was removed), in which case the
    /// caller should push the current subscription list to it.
    pub fn on_ping(&self, address: IpAddr, now: DateTime<Utc>) -> bool {
        let (agent, is_new) = self.agents.get_or_insert_with(address, || {
            Agent::new(address, self.connector.connect(address), now)
        });

        if is_new {
            info!(agent = %address, "tracking new agent");
        } else {
            agent.touch(now);
        }
        is_new
    }

    /// Refresh liveness for an already-tracked agent. Returns whether it is tracked.
    pub fn touch(&self, address: IpAddr, now: DateTime<Utc>) -> bool {
        match self.agents.get(&address) {
            Some(agent) => {
                agent.touch(now);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, address: IpAddr) -> Option<Arc<Agent>> {
        self.agents.get(&address)
    }

    /// Point-in-time copy of all tracked agents.
    pub fn all(&self) -> HashMap<IpAddr, Arc<Agent>> {
        self.agents.snapshot()
    }

    pub fn is_tracked(&self, address: IpAddr) -> bool {
        self.agents.contains(&address)
    }

    /// Stop tracking an agent. Idempotent.
    pub fn remove(&self, address: IpAddr) -> Option<Arc<Agent>> {
        let removed = self.agents.remove(&address);
        if removed.is_some() {
            info!(agent = %address, "agent removed");
        } else {
            debug!(agent = %address, "remove for untracked agent ignored");
        }
        removed
    }

    /// Agents not heard from for longer than `timeout` as of `now`.
    pub fn stale(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<Arc<Agent>> {
        self.agents
            .filter(|agent| (now - agent.last_seen()).to_std().unwrap_or_default() > timeout)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::link::AgentHandle;
    use crate::testing::{RecordingLink, at};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry(connects: Arc<AtomicUsize>) -> AgentRegistry {
        AgentRegistry::new(Arc::new(move |_addr: IpAddr| -> Arc<dyn AgentHandle> {
            connects.fetch_add(1, Ordering::SeqCst);
            Arc::new(RecordingLink::default())
        }))
    }

    #[test]
    fn first_ping_is_new_then_refreshes() {
        let connects = Arc::new(AtomicUsize::new(0));
        let reg = registry(Arc::clone(&connects));
        let addr: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(reg.on_ping(addr, at(1_000)));
        assert!(!reg.on_ping(addr, at(2_000)));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(reg.get(addr).unwrap().last_seen(), at(2_000));
    }

    #[test]
    fn ping_after_removal_is_new_again() {
        let reg = registry(Arc::new(AtomicUsize::new(0)));
        let addr: IpAddr = "10.0.0.1".parse().unwrap();

        assert!(reg.on_ping(addr, at(0)));
        assert!(reg.remove(addr).is_some());
        assert!(reg.remove(addr).is_none());
        assert!(!reg.is_tracked(addr));
        assert!(reg.on_ping(addr, at(10)));
    }

    #[test]
    fn touch_ignores_untracked_agents() {
        let reg = registry(Arc::new(AtomicUsize::new(0)));
        let addr: IpAddr = "10.0.0.9".parse().unwrap();
        assert!(!reg.touch(addr, at(5)));
        assert!(reg.is_empty());
    }

    #[test]
    fn stale_lists_only_silent_agents() {
        let reg = registry(Arc::new(AtomicUsize::new(0)));
        let quiet: IpAddr = "10.0.0.1".parse().unwrap();
        let chatty: IpAddr = "10.0.0.2".parse().unwrap();
        reg.on_ping(quiet, at(0));
        reg.on_ping(chatty, at(0));
        reg.touch(chatty, at(9_000));

        let stale = reg.stale(at(10_000), Duration::from_secs(5));
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].address(), quiet);
    }
}
