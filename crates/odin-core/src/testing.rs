// Shared fixtures for unit tests.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::AgentError;
use crate::link::AgentHandle;
use crate::model::{Agent, Client, ForwardingProgram, MacAddress};

/// One instruction observed by a [`RecordingLink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Sent {
    Subscriptions(String),
    Program(usize),
    Add(MacAddress),
    Remove(MacAddress),
    Update(MacAddress),
}

/// Agent link that records every instruction in order.
#[derive(Default)]
pub(crate) struct RecordingLink {
    pub(crate) sent: Mutex<Vec<Sent>>,
}

impl RecordingLink {
    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn record(&self, msg: Sent) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(msg);
        }
    }
}

impl AgentHandle for RecordingLink {
    fn push_subscriptions(&self, encoded: &str) -> Result<(), AgentError> {
        self.record(Sent::Subscriptions(encoded.to_owned()));
        Ok(())
    }
    fn install_forwarding_program(&self, program: &ForwardingProgram) -> Result<(), AgentError> {
        self.record(Sent::Program(program.rules.len()));
        Ok(())
    }
    fn add_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.record(Sent::Add(client.mac()));
        Ok(())
    }
    fn remove_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.record(Sent::Remove(client.mac()));
        Ok(())
    }
    fn update_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.record(Sent::Update(client.mac()));
        Ok(())
    }
}

pub(crate) fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn ip(s: &str) -> IpAddr {
    s.parse().unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub(crate) fn mac(s: &str) -> MacAddress {
    s.parse().unwrap_or(MacAddress::ZERO)
}

pub(crate) fn agent_with(addr: &str, link: Arc<RecordingLink>) -> Arc<Agent> {
    Arc::new(Agent::new(ip(addr), link, at(0)))
}
