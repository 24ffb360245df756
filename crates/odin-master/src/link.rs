// ── Agent control links ──
//
// One background writer per agent. Instructions are queued on an
// unbounded channel so the core never blocks on the network; the writer
// owns the TCP connection, dials lazily, and reports a broken link so
// the master can stop tracking the agent until it pings again.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use odin_core::{AgentConnector, AgentError, AgentHandle, Client, ForwardingProgram};

use crate::protocol::{flow_args, handler, vap_args, write_line};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ── AgentLink ────────────────────────────────────────────────────

/// Queue-backed [`AgentHandle`] for one agent.
pub struct AgentLink {
    agent: IpAddr,
    tx: mpsc::UnboundedSender<String>,
}

impl AgentLink {
    fn send(&self, handler: &str, args: &str) -> Result<(), AgentError> {
        self.tx
            .send(write_line(handler, args))
            .map_err(|_| AgentError::LinkClosed { agent: self.agent })
    }
}

impl AgentHandle for AgentLink {
    fn push_subscriptions(&self, encoded: &str) -> Result<(), AgentError> {
        self.send(handler::SUBSCRIPTIONS, encoded)
    }

    fn install_forwarding_program(&self, program: &ForwardingProgram) -> Result<(), AgentError> {
        if program.is_empty() {
            return Ok(());
        }
        self.send(handler::FLOWS, &flow_args(program))
    }

    fn add_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.send(handler::ADD_VAP, &vap_args(client))
    }

    fn remove_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.send(handler::REMOVE_VAP, &client.mac().to_string())
    }

    fn update_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.send(handler::SET_VAP, &vap_args(client))
    }
}

// ── TcpAgentConnector ────────────────────────────────────────────

/// Opens an [`AgentLink`] per agent and spawns its writer task.
pub struct TcpAgentConnector {
    control_port: u16,
    lost_tx: mpsc::UnboundedSender<IpAddr>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl TcpAgentConnector {
    /// `lost_tx` receives the address of every agent whose link breaks.
    pub fn new(
        control_port: u16,
        lost_tx: mpsc::UnboundedSender<IpAddr>,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            control_port,
            lost_tx,
            cancel,
            tracker,
        }
    }
}

impl AgentConnector for TcpAgentConnector {
    fn connect(&self, address: IpAddr) -> Arc<dyn AgentHandle> {
        let (tx, rx) = mpsc::unbounded_channel();
        let target = SocketAddr::new(address, self.control_port);
        self.tracker.spawn(writer_loop(
            target,
            rx,
            self.lost_tx.clone(),
            self.cancel.clone(),
        ));
        Arc::new(AgentLink { agent: address, tx })
    }
}

/// Drain queued lines onto the agent's control socket until the link is
/// dropped or shutdown is requested. A line that cannot be delivered is
/// discarded; the next one re-dials.
async fn writer_loop(
    target: SocketAddr,
    mut rx: mpsc::UnboundedReceiver<String>,
    lost_tx: mpsc::UnboundedSender<IpAddr>,
    cancel: CancellationToken,
) {
    let mut stream: Option<TcpStream> = None;

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => break,
            line = rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        if stream.is_none() {
            match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(target)).await {
                Ok(Ok(s)) => {
                    info!(agent = %target.ip(), "control link established");
                    stream = Some(s);
                }
                Ok(Err(e)) => {
                    warn!(agent = %target.ip(), error = %e, "control link connect failed");
                    let _ = lost_tx.send(target.ip());
                    continue;
                }
                Err(_) => {
                    warn!(agent = %target.ip(), "control link connect timed out");
                    let _ = lost_tx.send(target.ip());
                    continue;
                }
            }
        }

        if let Some(s) = stream.as_mut() {
            if let Err(e) = s.write_all(line.as_bytes()).await {
                warn!(agent = %target.ip(), error = %e, "control link write failed");
                stream = None;
                let _ = lost_tx.send(target.ip());
            }
        }
    }

    debug!(agent = %target.ip(), "control link writer stopped");
}
