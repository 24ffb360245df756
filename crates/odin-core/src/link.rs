// ── Outbound agent link ──
//
// The seam between the core and whatever transport reaches a physical
// agent. The core only ever calls these methods; it never encodes a
// wire message itself.

use std::net::IpAddr;
use std::sync::Arc;

use crate::error::AgentError;
use crate::model::{Client, ForwardingProgram};

/// Instructions the master can issue to one agent.
///
/// Implementations must not block: queue the instruction and return.
/// The handoff coordinator calls `add_lvap` / `remove_lvap` from pooled
/// tasks and every other method inline on the event path. An `Err` is
/// logged by the caller and never retried by the core.
pub trait AgentHandle: Send + Sync {
    /// Replace the agent's subscription list with the compiled encoding.
    fn push_subscriptions(&self, encoded: &str) -> Result<(), AgentError>;

    /// Install a client's flow rules on the agent's datapath.
    fn install_forwarding_program(&self, program: &ForwardingProgram) -> Result<(), AgentError>;

    /// Spawn the client's LVAP on the agent.
    fn add_lvap(&self, client: &Client) -> Result<(), AgentError>;

    /// Tear the client's LVAP down.
    fn remove_lvap(&self, client: &Client) -> Result<(), AgentError>;

    /// Refresh LVAP parameters (e.g. after the client's IP changed).
    fn update_lvap(&self, client: &Client) -> Result<(), AgentError>;
}

/// Factory for agent links, invoked the first time an agent pings.
pub trait AgentConnector: Send + Sync {
    fn connect(&self, address: IpAddr) -> Arc<dyn AgentHandle>;
}

impl<F> AgentConnector for F
where
    F: Fn(IpAddr) -> Arc<dyn AgentHandle> + Send + Sync,
{
    fn connect(&self, address: IpAddr) -> Arc<dyn AgentHandle> {
        self(address)
    }
}
