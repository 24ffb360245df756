// ── Registries ──
//
// Concurrent, injectable state objects for agents and clients. Every
// component that needs one receives it as an `Arc`; none is global.

mod agents;
mod clients;
mod collection;

pub use agents::AgentRegistry;
pub use clients::ClientRegistry;
