// ── Subscription registry ──
//
// Standing event subscriptions, their callbacks, and the compiled list
// every agent evaluates. Mutations are serialized; the fan-out to
// agents happens after the critical section and always sends the
// latest compiled list.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use crate::model::{Agent, EventSubscription, NotificationContext, SubscriptionId};
use crate::store::AgentRegistry;

/// Capability invoked when an agent reports a match for a subscription.
pub trait NotificationCallback: Send + Sync {
    fn exec(&self, subscription: &EventSubscription, ctx: &NotificationContext);
}

impl<F> NotificationCallback for F
where
    F: Fn(&EventSubscription, &NotificationContext) + Send + Sync,
{
    fn exec(&self, subscription: &EventSubscription, ctx: &NotificationContext) {
        self(subscription, ctx);
    }
}

#[derive(Clone)]
struct Registration {
    subscription: Arc<EventSubscription>,
    callback: Arc<dyn NotificationCallback>,
}

#[derive(Default)]
struct RegistryState {
    last_id: SubscriptionId,
    entries: BTreeMap<SubscriptionId, Registration>,
}

/// Registry of active subscriptions.
pub struct SubscriptionRegistry {
    agents: Arc<AgentRegistry>,
    state: Mutex<RegistryState>,
    compiled: ArcSwap<String>,
}

impl SubscriptionRegistry {
    pub fn new(agents: Arc<AgentRegistry>) -> Self {
        let state = RegistryState::default();
        let compiled = ArcSwap::from_pointee(encode(&state.entries));
        Self {
            agents,
            state: Mutex::new(state),
            compiled,
        }
    }

    /// Store a subscription and its callback under the next id, then
    /// push the recompiled list to every tracked agent.
    pub fn register(
        &self,
        subscription: EventSubscription,
        callback: Arc<dyn NotificationCallback>,
    ) -> SubscriptionId {
        let id = {
            let mut state = self.lock();
            state.last_id += 1;
            let id = state.last_id;
            state.entries.insert(
                id,
                Registration {
                    subscription: Arc::new(subscription),
                    callback,
                },
            );
            self.compiled.store(Arc::new(encode(&state.entries)));
            id
        };

        info!(subscription = id, "subscription registered");
        self.broadcast();
        id
    }

    /// Drop a subscription. Unknown ids are a no-op apart from the
    /// re-broadcast.
    pub fn unregister(&self, id: SubscriptionId) {
        let removed = {
            let mut state = self.lock();
            let removed = state.entries.remove(&id).is_some();
            self.compiled.store(Arc::new(encode(&state.entries)));
            removed
        };

        if removed {
            info!(subscription = id, "subscription unregistered");
        } else {
            debug!(subscription = id, "unregister for unknown subscription");
        }
        self.broadcast();
    }

    /// Invoke the callback registered under `id`.
    ///
    /// Returns `false` without error when the id is not registered: an
    /// agent may still report against a list it has not replaced yet.
    pub fn dispatch(&self, id: SubscriptionId, ctx: &NotificationContext) -> bool {
        // Clone out so the callback runs without the lock; it may
        // register or unregister subscriptions itself.
        let Some(registration) = self.lock().entries.get(&id).cloned() else {
            debug!(subscription = id, client = %ctx.client, "publish for stale subscription ignored");
            return false;
        };
        registration
            .callback
            .exec(&registration.subscription, ctx);
        true
    }

    /// The compiled list currently pushed to agents.
    pub fn compiled(&self) -> Arc<String> {
        self.compiled.load_full()
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<EventSubscription>> {
        self.lock()
            .entries
            .get(&id)
            .map(|r| Arc::clone(&r.subscription))
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push the current compiled list to a single agent.
    pub fn push_to(&self, agent: &Agent) {
        let compiled = self.compiled();
        if let Err(e) = agent.link().push_subscriptions(&compiled) {
            warn!(agent = %agent.address(), error = %e, "failed to push subscription list");
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn broadcast(&self) {
        for agent in self.agents.all().values() {
            self.push_to(agent);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wire encoding agents parse:
/// `<count> (<id> <client> <statistic> <relation ordinal> <threshold> )*`.
///
/// Every field, including the count, is followed by one space. A
/// wildcard client is sent as the all-zero address.
fn encode(entries: &BTreeMap<SubscriptionId, Registration>) -> String {
    let mut out = format!("{} ", entries.len());
    for (id, registration) in entries {
        let sub = &registration.subscription;
        let _ = write!(
            out,
            "{id} {} {} {} {} ",
            sub.client.wire_address(),
            sub.statistic,
            sub.relation.ordinal(),
            sub.threshold,
        );
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::link::AgentHandle;
    use crate::model::{ClientMatcher, Relation};
    use crate::testing::{RecordingLink, Sent, at, ip, mac};
    use pretty_assertions::assert_eq;
    use std::net::IpAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<AgentRegistry>, SubscriptionRegistry, Arc<RecordingLink>) {
        let link = Arc::new(RecordingLink::default());
        let shared = Arc::clone(&link);
        let agents = Arc::new(AgentRegistry::new(Arc::new(
            move |_addr: IpAddr| -> Arc<dyn AgentHandle> { Arc::clone(&shared) as Arc<dyn AgentHandle> },
        )));
        let subs = SubscriptionRegistry::new(Arc::clone(&agents));
        (agents, subs, link)
    }

    fn signal_any(threshold: f64) -> EventSubscription {
        EventSubscription::new(ClientMatcher::Any, "signal", Relation::GreaterThan, threshold)
    }

    fn noop() -> Arc<dyn NotificationCallback> {
        Arc::new(|_: &EventSubscription, _: &NotificationContext| {})
    }

    #[test]
    fn empty_registry_compiles_to_zero_count() {
        let (_, subs, _) = setup();
        assert_eq!(subs.compiled().as_str(), "0 ");
    }

    #[test]
    fn compiled_list_uses_wire_format() {
        let (_, subs, _) = setup();
        subs.register(signal_any(160.0), noop());
        subs.register(
            EventSubscription::new(
                ClientMatcher::Station(mac("aa:bb:cc:dd:ee:ff")),
                "rate",
                Relation::LessThan,
                5.5,
            ),
            noop(),
        );

        assert_eq!(
            subs.compiled().as_str(),
            "2 1 00:00:00:00:00:00 signal 0 160 2 aa:bb:cc:dd:ee:ff rate 1 5.5 "
        );
    }

    #[test]
    fn unregister_keeps_remaining_ids() {
        let (_, subs, _) = setup();
        let s1 = subs.register(signal_any(100.0), noop());
        let s2 = subs.register(signal_any(200.0), noop());
        subs.unregister(s1);

        assert_eq!(s2, 2);
        assert_eq!(subs.len(), 1);
        assert!(subs.get(s1).is_none());
        assert_eq!(subs.compiled().as_str(), "1 2 00:00:00:00:00:00 signal 0 200 ");
    }

    #[test]
    fn ids_are_never_reused() {
        let (_, subs, _) = setup();
        let s1 = subs.register(signal_any(1.0), noop());
        subs.unregister(s1);
        subs.unregister(s1);
        let s2 = subs.register(signal_any(1.0), noop());
        assert!(s2 > s1);
    }

    #[test]
    fn every_mutation_is_broadcast_to_agents() {
        let (agents, subs, link) = setup();
        agents.on_ping(ip("10.0.0.1"), at(0));

        let id = subs.register(signal_any(160.0), noop());
        subs.unregister(id);

        assert_eq!(
            link.sent(),
            vec![
                Sent::Subscriptions("1 1 00:00:00:00:00:00 signal 0 160 ".into()),
                Sent::Subscriptions("0 ".into()),
            ]
        );
    }

    #[test]
    fn dispatch_invokes_callback_and_ignores_stale_ids() {
        let (agents, subs, _) = setup();
        agents.on_ping(ip("10.0.0.1"), at(0));
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let id = subs.register(
            signal_any(160.0),
            Arc::new(move |sub: &EventSubscription, ctx: &NotificationContext| {
                assert_eq!(sub.statistic, "signal");
                assert_eq!(ctx.value, 170);
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let ctx = NotificationContext {
            client: mac("aa:aa:aa:aa:aa:aa"),
            agent: agents.get(ip("10.0.0.1")).unwrap(),
            value: 170,
        };
        assert!(subs.dispatch(id, &ctx));
        subs.unregister(id);
        assert!(!subs.dispatch(id, &ctx));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
