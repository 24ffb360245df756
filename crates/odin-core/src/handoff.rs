// ── Handoff coordinator ──
//
// Moves a client's LVAP onto a target agent. The hosting-agent pointer
// is committed synchronously; on migration the physical add and remove
// run as two independent pool jobs with no barrier between them, so a
// client may briefly have its LVAP on both agents or on neither.

use std::net::IpAddr;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::model::{Agent, Client, MacAddress};
use crate::pool::WorkerPool;
use crate::store::{AgentRegistry, ClientRegistry};

/// What a handoff request did. Purely informational: every outcome,
/// including the aborts, has already been logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoffOutcome {
    /// The client or agent address cannot identify a real endpoint.
    InvalidArgument,
    UnknownAgent,
    UnknownClient,
    /// The client had no hosting agent and is now hosted by the target.
    Assigned,
    /// The target already hosts the client; nothing was sent.
    AlreadyAssigned,
    /// The pointer now names the target; add and remove are in flight.
    Migrated { from: IpAddr },
}

impl HandoffOutcome {
    /// Whether the hosting-agent pointer changed.
    pub fn moved(self) -> bool {
        matches!(self, Self::Assigned | Self::Migrated { .. })
    }
}

pub struct HandoffCoordinator {
    agents: Arc<AgentRegistry>,
    clients: Arc<ClientRegistry>,
    pool: WorkerPool,
}

impl HandoffCoordinator {
    pub fn new(agents: Arc<AgentRegistry>, clients: Arc<ClientRegistry>, pool: WorkerPool) -> Self {
        Self {
            agents,
            clients,
            pool,
        }
    }

    /// Hand the LVAP of `client` off to the agent at `target`.
    ///
    /// Idempotent for a target that already hosts the client. Two
    /// concurrent calls for the same client race and the last pointer
    /// update wins.
    pub fn handoff(&self, client: MacAddress, target: IpAddr) -> HandoffOutcome {
        if !client.is_station() || target.is_unspecified() {
            error!(client = %client, agent = %target, "handoff rejected: invalid client or agent address");
            return HandoffOutcome::InvalidArgument;
        }
        let Some(agent) = self.agents.get(target) else {
            error!(client = %client, agent = %target, "handoff aborted: unknown agent");
            return HandoffOutcome::UnknownAgent;
        };
        let Some(record) = self.clients.get(client) else {
            error!(client = %client, agent = %target, "handoff aborted: unknown client");
            return HandoffOutcome::UnknownClient;
        };

        match record.agent() {
            None => {
                install_program(&agent, &record);
                if let Err(e) = agent.link().add_lvap(&record) {
                    warn!(client = %client, agent = %target, error = %e, "failed to add LVAP");
                }
                record.set_agent(Some(agent));
                info!(client = %client, agent = %target, "client assigned");
                HandoffOutcome::Assigned
            }
            Some(current) if current.address() == target => {
                debug!(client = %client, agent = %target, "client already on target agent");
                HandoffOutcome::AlreadyAssigned
            }
            Some(previous) => {
                let from = previous.address();
                install_program(&agent, &record);
                record.set_agent(Some(Arc::clone(&agent)));
                info!(client = %client, from = %from, to = %target, "client handed off");

                let added = Arc::clone(&record);
                self.pool.spawn("add_lvap", move || {
                    if let Err(e) = agent.link().add_lvap(&added) {
                        warn!(client = %added.mac(), agent = %agent.address(), error = %e, "failed to add LVAP");
                    }
                });
                self.pool.spawn("remove_lvap", move || {
                    if let Err(e) = previous.link().remove_lvap(&record) {
                        warn!(client = %record.mac(), agent = %previous.address(), error = %e, "failed to remove LVAP");
                    }
                });
                HandoffOutcome::Migrated { from }
            }
        }
    }
}

fn install_program(agent: &Agent, client: &Client) {
    let program = client.forwarding_program();
    if let Err(e) = agent.link().install_forwarding_program(&program) {
        warn!(client = %client.mac(), agent = %agent.address(), error = %e, "failed to install forwarding program");
    }
}
