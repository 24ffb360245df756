// ── Domain model ──
//
// Canonical types shared by every registry and the handoff machinery.

pub mod agent;
pub mod client;
pub mod forwarding;
pub mod mac;
pub mod subscription;

pub use agent::Agent;
pub use client::{AuthorizedClient, Client, Lvap};
pub use forwarding::{FlowMatch, FlowRule, ForwardingProgram};
pub use mac::MacAddress;
pub use subscription::{
    ClientMatcher, EventSubscription, NotificationContext, Relation, SubscriptionId,
};
