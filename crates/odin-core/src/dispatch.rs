// ── Publish event dispatch ──

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;

use tracing::debug;

use crate::model::{MacAddress, NotificationContext, SubscriptionId};
use crate::store::AgentRegistry;
use crate::subscription::SubscriptionRegistry;

/// Routes the observations carried by one publish message to the
/// callbacks of the subscriptions they matched.
pub struct EventDispatcher {
    agents: Arc<AgentRegistry>,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl EventDispatcher {
    pub fn new(agents: Arc<AgentRegistry>, subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            agents,
            subscriptions,
        }
    }

    /// Dispatch every `(subscription id, observed value)` pair in order.
    ///
    /// Publishes from untracked agents are dropped. Returns the number of
    /// callbacks actually invoked; ids that are no longer registered are
    /// skipped silently.
    pub fn on_publish(
        &self,
        client: MacAddress,
        origin: IpAddr,
        observations: &BTreeMap<SubscriptionId, i64>,
    ) -> usize {
        if observations.is_empty() {
            debug!(client = %client, agent = %origin, "publish without observations dropped");
            return 0;
        }
        let Some(agent) = self.agents.get(origin) else {
            debug!(client = %client, agent = %origin, "publish from untracked agent dropped");
            return 0;
        };

        let mut invoked = 0;
        for (&id, &value) in observations {
            let ctx = NotificationContext {
                client,
                agent: Arc::clone(&agent),
                value,
            };
            if self.subscriptions.dispatch(id, &ctx) {
                invoked += 1;
            }
        }
        invoked
    }
}
