//! Control plane of an Odin software-defined WLAN master.
//!
//! Every client gets its own virtual access point (LVAP) that the master
//! can move between physical agents without the client re-associating.
//! This crate owns the state and the decisions; transports live in the
//! host binary and plug in through [`AgentHandle`] / [`AgentConnector`].
//!
//! - **[`Master`]**: Cheaply cloneable facade. Receives agent pings,
//!   probes and publishes, exposes handoff and subscriptions to
//!   applications, reaps silent agents.
//!
//! - **Registries** ([`store`]): `DashMap`-backed [`AgentRegistry`] and
//!   [`ClientRegistry`], injected into every component that needs them.
//!
//! - **[`HandoffCoordinator`]**: Assigns or migrates an LVAP. The
//!   hosting-agent pointer moves first; the remote add/remove run as
//!   independent jobs on the [`WorkerPool`].
//!
//! - **[`SubscriptionRegistry`]**: Standing filters compiled into the
//!   single-line list every agent evaluates, plus the callbacks that
//!   publish events are routed to by the [`EventDispatcher`].
//!
//! - **[`MobilityManager`]**: Reference application: signal-driven
//!   handoff with hysteresis, idle recovery and an incumbent margin.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod handoff;
pub mod link;
pub mod lvap;
pub mod master;
pub mod mobility;
pub mod model;
pub mod pool;
pub mod store;
pub mod subscription;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{LvapConfig, MasterConfig, MobilityConfig};
pub use dispatch::EventDispatcher;
pub use error::{AgentError, CoreError};
pub use handoff::{HandoffCoordinator, HandoffOutcome};
pub use link::{AgentConnector, AgentHandle};
pub use lvap::{DefaultLvapAssigner, LvapAssigner};
pub use master::{Master, OdinApplication};
pub use mobility::{MobilityDecision, MobilityManager, MobilityStats};
pub use pool::WorkerPool;
pub use store::{AgentRegistry, ClientRegistry};
pub use subscription::{NotificationCallback, SubscriptionRegistry};

pub use model::{
    Agent, AuthorizedClient, Client, ClientMatcher, EventSubscription, FlowMatch, FlowRule,
    ForwardingProgram, Lvap, MacAddress, NotificationContext, Relation, SubscriptionId,
};
