// ── Core error types ──
//
// Nothing in the master's control verbs returns these to a protocol
// caller: handoff, dispatch and broadcast degrade to "log and continue".
// `CoreError` surfaces only from parsers and constructors of typed
// values; `AgentError` is what an outbound agent push reports back so
// the caller can log it.

use std::net::IpAddr;

use thiserror::Error;

/// Validation and parse failures for core value types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid MAC address: {input}")]
    InvalidMacAddress { input: String },
}

/// Failure of a single outbound instruction to an agent.
///
/// Always advisory: the enclosing operation logs it and carries on.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Control link to agent {agent} is closed")]
    LinkClosed { agent: IpAddr },
}
