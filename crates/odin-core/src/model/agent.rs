// ── Agent domain type ──

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};

use crate::link::AgentHandle;

/// A physical access point running the agent side of the protocol.
///
/// Identity is the agent's network address. The only mutable state is
/// the liveness timestamp, refreshed on every ping, probe, or publish.
pub struct Agent {
    address: IpAddr,
    last_seen_ms: AtomicI64,
    link: Arc<dyn AgentHandle>,
}

impl Agent {
    pub fn new(address: IpAddr, link: Arc<dyn AgentHandle>, now: DateTime<Utc>) -> Self {
        Self {
            address,
            last_seen_ms: AtomicI64::new(now.timestamp_millis()),
            link,
        }
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn last_seen(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_seen_ms.load(Ordering::Acquire)).unwrap_or_default()
    }

    /// Record that the agent was heard from at `now`. Never moves backwards.
    pub fn touch(&self, now: DateTime<Utc>) {
        self.last_seen_ms
            .fetch_max(now.timestamp_millis(), Ordering::AcqRel);
    }

    /// Handle used to push subscriptions, flow rules, and LVAP changes.
    pub fn link(&self) -> &dyn AgentHandle {
        self.link.as_ref()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("address", &self.address)
            .field("last_seen", &self.last_seen())
            .finish_non_exhaustive()
    }
}
