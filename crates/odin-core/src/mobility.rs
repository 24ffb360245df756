// ── Reference mobility policy ──
//
// Decides handoffs from `signal` observations. Sticky toward the
// incumbent agent: a foreign agent must out-hear it by a margin, and
// only once the client has dwelt past the hysteresis window. A client
// whose host has gone quiet goes to whoever hears it next.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::MobilityConfig;
use crate::handoff::{HandoffCoordinator, HandoffOutcome};
use crate::master::{Master, OdinApplication};
use crate::model::{
    ClientMatcher, EventSubscription, MacAddress, NotificationContext, Relation,
};
use crate::store::ClientRegistry;
use crate::subscription::NotificationCallback;

/// Per-client state the policy keeps between observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MobilityStats {
    /// Last value reported by the hosting agent.
    pub signal: i64,
    pub last_heard: DateTime<Utc>,
    pub assigned: DateTime<Utc>,
}

impl MobilityStats {
    fn fresh(signal: i64, now: DateTime<Utc>) -> Self {
        Self {
            signal,
            last_heard: now,
            assigned: now,
        }
    }
}

/// Why an observation did or did not move the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobilityDecision {
    UnknownClient,
    /// The hosting agent reported; stats refreshed.
    Refreshed,
    /// A foreign agent reported inside the hysteresis window.
    WithinHysteresis,
    /// A foreign agent reported but did not beat the incumbent by the margin.
    BelowMargin,
    HandedOff(HandoffOutcome),
}

pub struct MobilityManager {
    hysteresis: TimeDelta,
    idle_client: TimeDelta,
    margin: i64,
    subscription_threshold: f64,
    clients: Arc<ClientRegistry>,
    handoff: Arc<HandoffCoordinator>,
    stats: DashMap<MacAddress, MobilityStats>,
}

impl MobilityManager {
    pub fn new(
        config: &MobilityConfig,
        clients: Arc<ClientRegistry>,
        handoff: Arc<HandoffCoordinator>,
    ) -> Self {
        Self {
            hysteresis: TimeDelta::from_std(config.hysteresis).unwrap_or(TimeDelta::MAX),
            idle_client: TimeDelta::from_std(config.idle_client).unwrap_or(TimeDelta::MAX),
            margin: config.signal_strength_threshold,
            subscription_threshold: config.subscription_threshold,
            clients,
            handoff,
            stats: DashMap::new(),
        }
    }

    /// Apply one observation reported at `now`.
    pub fn observe(&self, ctx: &NotificationContext, now: DateTime<Utc>) -> MobilityDecision {
        let Some(client) = self.clients.get(ctx.client) else {
            debug!(client = %ctx.client, "observation for unknown client ignored");
            return MobilityDecision::UnknownClient;
        };
        let origin = ctx.agent.address();

        // The entry guard serializes decisions for one client.
        let mut stats = self
            .stats
            .entry(ctx.client)
            .or_insert_with(|| MobilityStats::fresh(ctx.value, now));

        let Some(host) = client.agent() else {
            *stats = MobilityStats::fresh(ctx.value, now);
            return self.hand_off(ctx.client, origin, "unassigned");
        };

        if now - stats.last_heard > self.idle_client {
            *stats = MobilityStats::fresh(ctx.value, now);
            return self.hand_off(ctx.client, origin, "idle on current agent");
        }

        if host.address() == origin {
            stats.signal = ctx.value;
            stats.last_heard = now;
            return MobilityDecision::Refreshed;
        }

        if now - stats.assigned < self.hysteresis {
            debug!(client = %ctx.client, agent = %origin, "within hysteresis window");
            return MobilityDecision::WithinHysteresis;
        }

        if ctx.value >= stats.signal.saturating_add(self.margin) {
            *stats = MobilityStats::fresh(ctx.value, now);
            return self.hand_off(ctx.client, origin, "stronger signal");
        }
        MobilityDecision::BelowMargin
    }

    /// Current stats for `client`, if it has been observed.
    pub fn stats(&self, client: MacAddress) -> Option<MobilityStats> {
        self.stats.get(&client).map(|s| *s)
    }

    fn hand_off(&self, client: MacAddress, target: IpAddr, reason: &'static str) -> MobilityDecision {
        let outcome = self.handoff.handoff(client, target);
        if outcome.moved() {
            info!(client = %client, agent = %target, reason, "mobility handoff");
        } else {
            debug!(client = %client, agent = %target, reason, ?outcome, "mobility handoff did not move client");
        }
        MobilityDecision::HandedOff(outcome)
    }
}

impl NotificationCallback for MobilityManager {
    fn exec(&self, _subscription: &EventSubscription, ctx: &NotificationContext) {
        self.observe(ctx, Utc::now());
    }
}

impl OdinApplication for MobilityManager {
    fn name(&self) -> &'static str {
        "mobility-manager"
    }

    fn start(self: Arc<Self>, master: &Master) {
        let threshold = self.subscription_threshold;
        master.register_subscription(
            EventSubscription::new(ClientMatcher::Any, "signal", Relation::GreaterThan, threshold),
            self,
        );
    }
}
