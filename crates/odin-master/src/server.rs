// ── Agent datagram server ──
//
// Single loop multiplexing agent datagrams, lost-link reports, the
// stale agent reaper, and shutdown. Each datagram is handled to
// completion before the next is read.

use std::net::IpAddr;
use std::time::Duration;

use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use odin_core::Master;

use crate::error::MasterError;
use crate::protocol::AgentMessage;

const MAX_DATAGRAM: usize = 1500;

/// Serve agents on `socket` until `cancel` fires.
pub async fn serve(
    master: Master,
    socket: UdpSocket,
    reap_interval: Duration,
    mut lost_rx: mpsc::UnboundedReceiver<IpAddr>,
    cancel: CancellationToken,
) -> Result<(), MasterError> {
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut reaper = tokio::time::interval(reap_interval.max(Duration::from_secs(1)));
    reaper.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(listen = %socket.local_addr()?, "serving agents");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            received = socket.recv_from(&mut buf) => {
                let (len, from) = received?;
                let datagram = String::from_utf8_lossy(buf.get(..len).unwrap_or_default());
                handle_datagram(&master, from.ip(), &datagram);
            }
            Some(agent) = lost_rx.recv() => {
                master.agent_disconnected(agent);
            }
            _ = reaper.tick() => {
                let reaped = master.reap_stale_agents(Utc::now());
                if !reaped.is_empty() {
                    debug!(count = reaped.len(), "reaped stale agents");
                }
            }
        }
    }

    info!("agent server stopped");
    Ok(())
}

/// Route one datagram from the agent at `from` into the master.
pub fn handle_datagram(master: &Master, from: IpAddr, datagram: &str) {
    match AgentMessage::parse(datagram) {
        Ok(AgentMessage::Ping) => master.receive_ping(from),
        Ok(AgentMessage::Probe { client }) => {
            master.receive_probe(from, client);
        }
        Ok(AgentMessage::Publish {
            client,
            observations,
        }) => {
            master.receive_publish(client, from, &observations);
        }
        Err(e) => debug!(agent = %from, error = %e, "dropping malformed datagram"),
    }
}
