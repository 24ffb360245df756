// ── Event subscription types ──

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::agent::Agent;
use super::mac::MacAddress;
use crate::error::CoreError;

/// Monotonically increasing subscription identifier. Never reused.
pub type SubscriptionId = u64;

/// Comparison an agent applies between an observed statistic and the
/// subscription threshold.
///
/// Declaration order is the wire ordinal and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    GreaterThan,
    LessThan,
    Equals,
}

impl Relation {
    /// Index of the variant in declaration order, as agents expect it.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::GreaterThan => 0,
            Self::LessThan => 1,
            Self::Equals => 2,
        }
    }
}

/// Which stations a subscription applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientMatcher {
    /// Every station (`*`).
    Any,
    Station(MacAddress),
}

impl ClientMatcher {
    /// Address sent to agents; the wildcard travels as the all-zero address.
    pub fn wire_address(&self) -> MacAddress {
        match self {
            Self::Any => MacAddress::ZERO,
            Self::Station(mac) => *mac,
        }
    }
}

impl fmt::Display for ClientMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Station(mac) => write!(f, "{mac}"),
        }
    }
}

impl FromStr for ClientMatcher {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "*" {
            Ok(Self::Any)
        } else {
            s.parse().map(Self::Station)
        }
    }
}

/// A standing filter agents evaluate locally, reporting matches back
/// to the master as publish events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubscription {
    pub client: ClientMatcher,
    pub statistic: String,
    pub relation: Relation,
    pub threshold: f64,
}

impl EventSubscription {
    pub fn new(
        client: ClientMatcher,
        statistic: impl Into<String>,
        relation: Relation,
        threshold: f64,
    ) -> Self {
        Self {
            client,
            statistic: statistic.into(),
            relation,
            threshold,
        }
    }
}

/// What a notification callback receives for one matched observation.
#[derive(Debug, Clone)]
pub struct NotificationContext {
    pub client: MacAddress,
    pub agent: Arc<Agent>,
    pub value: i64,
}
