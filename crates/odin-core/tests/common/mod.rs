// Shared fixtures for odin-core integration tests.
#![allow(dead_code, clippy::unwrap_used)]

use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use odin_core::{
    AgentConnector, AgentError, AgentHandle, Client, ForwardingProgram, MacAddress, Master,
    MasterConfig,
};

/// One instruction as seen by the agent it was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Subscriptions(String),
    Program,
    Add(MacAddress),
    Remove(MacAddress),
    Update(MacAddress),
}

/// Every instruction sent to any agent, in the order it was issued.
#[derive(Default)]
pub struct Journal {
    ops: Mutex<Vec<(IpAddr, Op)>>,
    failing: AtomicBool,
}

impl Journal {
    pub fn all(&self) -> Vec<(IpAddr, Op)> {
        self.ops.lock().unwrap().clone()
    }

    pub fn for_agent(&self, agent: IpAddr) -> Vec<Op> {
        self.all()
            .into_iter()
            .filter(|(addr, _)| *addr == agent)
            .map(|(_, op)| op)
            .collect()
    }

    /// LVAP adds and removes only, across all agents.
    pub fn lvap_ops(&self) -> Vec<(IpAddr, Op)> {
        self.all()
            .into_iter()
            .filter(|(_, op)| matches!(op, Op::Add(_) | Op::Remove(_)))
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().unwrap().clear();
    }

    /// Make every forwarding-program install fail from now on.
    pub fn fail_programs(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    fn record(&self, agent: IpAddr, op: Op) {
        self.ops.lock().unwrap().push((agent, op));
    }
}

struct JournalLink {
    agent: IpAddr,
    journal: Arc<Journal>,
}

impl AgentHandle for JournalLink {
    fn push_subscriptions(&self, encoded: &str) -> Result<(), AgentError> {
        self.journal
            .record(self.agent, Op::Subscriptions(encoded.to_owned()));
        Ok(())
    }

    fn install_forwarding_program(&self, _program: &ForwardingProgram) -> Result<(), AgentError> {
        if self.journal.failing.load(Ordering::SeqCst) {
            return Err(AgentError::LinkClosed { agent: self.agent });
        }
        self.journal.record(self.agent, Op::Program);
        Ok(())
    }

    fn add_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.journal.record(self.agent, Op::Add(client.mac()));
        Ok(())
    }

    fn remove_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.journal.record(self.agent, Op::Remove(client.mac()));
        Ok(())
    }

    fn update_lvap(&self, client: &Client) -> Result<(), AgentError> {
        self.journal.record(self.agent, Op::Update(client.mac()));
        Ok(())
    }
}

pub struct JournalConnector {
    journal: Arc<Journal>,
}

impl AgentConnector for JournalConnector {
    fn connect(&self, address: IpAddr) -> Arc<dyn AgentHandle> {
        Arc::new(JournalLink {
            agent: address,
            journal: Arc::clone(&self.journal),
        })
    }
}

pub fn master() -> (Master, Arc<Journal>) {
    master_with(MasterConfig::default())
}

pub fn master_with(config: MasterConfig) -> (Master, Arc<Journal>) {
    let journal = Arc::new(Journal::default());
    let connector = Arc::new(JournalConnector {
        journal: Arc::clone(&journal),
    });
    (Master::new(config, connector), journal)
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn mac(s: &str) -> MacAddress {
    s.parse().unwrap()
}
