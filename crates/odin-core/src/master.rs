// ── Master facade ──
//
// Owns the registries and wires the components together. The host
// transport calls the `receive_*` verbs; applications use the handoff
// and subscription API. No verb returns an error: every failure has
// already been logged and the outcome value is informational.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::MasterConfig;
use crate::dispatch::EventDispatcher;
use crate::handoff::{HandoffCoordinator, HandoffOutcome};
use crate::link::AgentConnector;
use crate::lvap::{DefaultLvapAssigner, LvapAssigner};
use crate::mobility::MobilityManager;
use crate::model::{
    Agent, AuthorizedClient, Client, EventSubscription, Lvap, MacAddress, SubscriptionId,
};
use crate::pool::WorkerPool;
use crate::store::{AgentRegistry, ClientRegistry};
use crate::subscription::{NotificationCallback, SubscriptionRegistry};

// ── OdinApplication ──────────────────────────────────────────────

/// A control application running on top of the master.
///
/// `start` is called once; the application typically registers its
/// subscriptions there and reacts from its callbacks afterwards.
pub trait OdinApplication: Send + Sync {
    fn name(&self) -> &'static str;

    fn start(self: Arc<Self>, master: &Master);
}

// ── Master ───────────────────────────────────────────────────────

/// The control plane entry point.
///
/// Cheaply cloneable via `Arc<MasterInner>`. Every clone shares the
/// same registries.
#[derive(Clone)]
pub struct Master {
    inner: Arc<MasterInner>,
}

struct MasterInner {
    config: MasterConfig,
    agents: Arc<AgentRegistry>,
    clients: Arc<ClientRegistry>,
    subscriptions: Arc<SubscriptionRegistry>,
    dispatcher: EventDispatcher,
    handoff: Arc<HandoffCoordinator>,
    assigner: Arc<dyn LvapAssigner>,
    pool: WorkerPool,
}

impl Master {
    /// Create a master using the default LVAP naming policy.
    pub fn new(config: MasterConfig, connector: Arc<dyn AgentConnector>) -> Self {
        let assigner = Arc::new(DefaultLvapAssigner::new(config.lvap.clone()));
        Self::with_lvap_assigner(config, connector, assigner)
    }

    pub fn with_lvap_assigner(
        config: MasterConfig,
        connector: Arc<dyn AgentConnector>,
        assigner: Arc<dyn LvapAssigner>,
    ) -> Self {
        let pool = WorkerPool::new(config.worker_pool_size);
        let agents = Arc::new(AgentRegistry::new(connector));
        let clients = Arc::new(ClientRegistry::new());
        let subscriptions = Arc::new(SubscriptionRegistry::new(Arc::clone(&agents)));
        let dispatcher = EventDispatcher::new(Arc::clone(&agents), Arc::clone(&subscriptions));
        let handoff = Arc::new(HandoffCoordinator::new(
            Arc::clone(&agents),
            Arc::clone(&clients),
            pool.clone(),
        ));

        Self {
            inner: Arc::new(MasterInner {
                config,
                agents,
                clients,
                subscriptions,
                dispatcher,
                handoff,
                assigner,
                pool,
            }),
        }
    }

    pub fn config(&self) -> &MasterConfig {
        &self.inner.config
    }

    // ── Inbound protocol verbs ───────────────────────────────────

    /// An agent announced itself. A first ping gets the current
    /// subscription list pushed to it.
    pub fn receive_ping(&self, agent: IpAddr) {
        let inner = &self.inner;
        if inner.agents.on_ping(agent, Utc::now()) {
            if let Some(tracked) = inner.agents.get(agent) {
                inner.subscriptions.push_to(&tracked);
            }
        }
    }

    /// A tracked agent heard a probe request from `client`.
    ///
    /// Unknown stations get a fresh LVAP; unassigned ones are handed off
    /// to the probing agent. Returns the handoff outcome if one was
    /// attempted.
    pub fn receive_probe(&self, agent: IpAddr, client: MacAddress) -> Option<HandoffOutcome> {
        let inner = &self.inner;
        if !client.is_station() {
            debug!(client = %client, agent = %agent, "probe from non-station address ignored");
            return None;
        }
        if !inner.agents.touch(agent, Utc::now()) {
            debug!(client = %client, agent = %agent, "probe from untracked agent ignored");
            return None;
        }

        // Check-then-insert without a lock: two concurrent first probes
        // for the same station can both create a record, and the later
        // insert wins.
        let record = match inner.clients.get(client) {
            Some(existing) => existing,
            None => {
                info!(client = %client, agent = %agent, "new client");
                inner
                    .clients
                    .add(Arc::new(inner.assigner.new_lvap_for(client)))
            }
        };

        if record.agent().is_some() {
            return None;
        }
        Some(inner.handoff.handoff(client, agent))
    }

    /// An agent reported subscription matches for `client`. Returns how
    /// many callbacks ran.
    pub fn receive_publish(
        &self,
        client: MacAddress,
        agent: IpAddr,
        observations: &BTreeMap<SubscriptionId, i64>,
    ) -> usize {
        self.inner.agents.touch(agent, Utc::now());
        self.inner.dispatcher.on_publish(client, agent, observations)
    }

    /// The address snooper saw `client` lease `ip`.
    ///
    /// Returns `true` when the client's address changed and its agent was
    /// told about it.
    pub fn on_address_learned(&self, client: MacAddress, ip: IpAddr) -> bool {
        let inner = &self.inner;
        let Some(record) = inner.clients.get(client) else {
            return false;
        };
        if ip.is_unspecified() || record.ip() == Some(ip) {
            return false;
        }

        info!(client = %client, ip = %ip, "client address updated");
        record.set_ip(Some(ip));
        record.set_forwarding_program(inner.assigner.default_forwarding_program(ip));

        if let Some(agent) = record.agent() {
            let link = agent.link();
            if let Err(e) = link.install_forwarding_program(&record.forwarding_program()) {
                warn!(client = %client, agent = %agent.address(), error = %e, "failed to install forwarding program");
            }
            if let Err(e) = link.update_lvap(&record) {
                warn!(client = %client, agent = %agent.address(), error = %e, "failed to update LVAP");
            }
        }
        true
    }

    /// The transport lost the agent's control link.
    pub fn agent_disconnected(&self, agent: IpAddr) {
        self.inner.agents.remove(agent);
    }

    // ── Application API ──────────────────────────────────────────

    pub fn handoff(&self, client: MacAddress, agent: IpAddr) -> HandoffOutcome {
        self.inner.handoff.handoff(client, agent)
    }

    pub fn register_subscription(
        &self,
        subscription: EventSubscription,
        callback: Arc<dyn NotificationCallback>,
    ) -> SubscriptionId {
        self.inner.subscriptions.register(subscription, callback)
    }

    pub fn unregister_subscription(&self, id: SubscriptionId) {
        self.inner.subscriptions.unregister(id);
    }

    /// The subscription list as currently pushed to agents.
    pub fn compiled_subscriptions(&self) -> Arc<String> {
        self.inner.subscriptions.compiled()
    }

    pub fn agents(&self) -> HashMap<IpAddr, Arc<Agent>> {
        self.inner.agents.all()
    }

    pub fn agent(&self, address: IpAddr) -> Option<Arc<Agent>> {
        self.inner.agents.get(address)
    }

    pub fn client(&self, mac: MacAddress) -> Option<Arc<Client>> {
        self.inner.clients.get(mac)
    }

    pub fn clients(&self) -> HashMap<MacAddress, Arc<Client>> {
        self.inner.clients.all()
    }

    pub fn offloaded_clients(&self) -> HashMap<MacAddress, Arc<Client>> {
        self.inner.clients.all_offloaded()
    }

    /// Start an application against this master.
    pub fn start_application(&self, app: Arc<dyn OdinApplication>) {
        info!(application = app.name(), "starting application");
        app.start(self);
    }

    /// The reference mobility policy, wired to this master's registries.
    pub fn mobility_manager(&self) -> Arc<MobilityManager> {
        Arc::new(MobilityManager::new(
            &self.inner.config.mobility,
            Arc::clone(&self.inner.clients),
            Arc::clone(&self.inner.handoff),
        ))
    }

    // ── Startup ──────────────────────────────────────────────────

    /// Pre-populate the client registry from a static authorization
    /// list. Returns the number of clients loaded.
    pub fn load_authorized_clients<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = AuthorizedClient>,
    {
        let inner = &self.inner;
        let mut loaded = 0;
        for entry in entries {
            info!(client = %entry.mac, ip = %entry.ip, bssid = %entry.bssid, ssid = %entry.ssid, "adding authorized client");
            let client = inner
                .clients
                .add_cold_start(entry.mac, entry.ip, Lvap::new(entry.bssid, entry.ssid));
            client.set_forwarding_program(inner.assigner.default_forwarding_program(entry.ip));
            loaded += 1;
        }
        loaded
    }

    // ── Maintenance ──────────────────────────────────────────────

    /// Drop every agent silent for longer than the configured timeout
    /// and detach the clients it hosted, so the next probe or observation
    /// from a live agent re-assigns them. Returns the removed addresses.
    pub fn reap_stale_agents(&self, now: DateTime<Utc>) -> Vec<IpAddr> {
        let inner = &self.inner;
        let mut reaped = Vec::new();
        for agent in inner.agents.stale(now, inner.config.agent_timeout) {
            let address = agent.address();
            warn!(agent = %address, last_seen = %agent.last_seen(), "agent timed out");
            inner.agents.remove(address);
            for client in inner.clients.hosted_by(address) {
                if client.detach_from(address) {
                    info!(client = %client.mac(), agent = %address, "client detached from lost agent");
                }
            }
            reaped.push(address);
        }
        reaped
    }

    /// Steer a client off WiFi: tear its LVAP down and park it in the
    /// offloaded registry. Returns `false` if the client is unknown.
    pub fn offload_client(&self, mac: MacAddress) -> bool {
        let inner = &self.inner;
        let Some(client) = inner.clients.remove(mac) else {
            debug!(client = %mac, "offload for unknown client ignored");
            return false;
        };
        if let Some(agent) = client.agent() {
            if let Err(e) = agent.link().remove_lvap(&client) {
                warn!(client = %mac, agent = %agent.address(), error = %e, "failed to remove LVAP");
            }
        }
        client.set_agent(None);
        inner.clients.add_offloaded(client);
        info!(client = %mac, "client offloaded");
        true
    }

    /// Bring an offloaded client back, unassigned. Returns `false` if it
    /// was not offloaded.
    pub fn restore_client(&self, mac: MacAddress) -> bool {
        let inner = &self.inner;
        let Some(client) = inner.clients.remove_offloaded(mac) else {
            debug!(client = %mac, "restore for client not offloaded ignored");
            return false;
        };
        inner.clients.add(client);
        info!(client = %mac, "client restored");
        true
    }

    /// Wait for every in-flight asynchronous handoff task.
    pub async fn quiesce(&self) {
        self.inner.pool.wait_idle().await;
    }
}
