// ── Agent wire protocol ──
//
// Inbound datagrams are single ASCII lines, space-delimited:
//
//   ping
//   probe <client mac>
//   publish <client mac> <count> (<subscription id> <value>)*
//
// Outbound control lines are `WRITE odinagent.<handler> <args>` over the
// agent's TCP control socket.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::net::{IpAddr, Ipv4Addr};

use thiserror::Error;

use odin_core::{Client, FlowMatch, ForwardingProgram, MacAddress, SubscriptionId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty datagram")]
    Empty,

    #[error("unknown message type '{0}'")]
    UnknownType(String),

    #[error("malformed {kind} message: {reason}")]
    Malformed { kind: &'static str, reason: String },
}

/// A message received from an agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentMessage {
    Ping,
    Probe {
        client: MacAddress,
    },
    Publish {
        client: MacAddress,
        observations: BTreeMap<SubscriptionId, i64>,
    },
}

impl AgentMessage {
    pub fn parse(datagram: &str) -> Result<Self, ProtocolError> {
        let mut fields = datagram.split_whitespace();
        let kind = fields.next().ok_or(ProtocolError::Empty)?;

        match kind {
            "ping" => Ok(Self::Ping),
            "probe" => Ok(Self::Probe {
                client: client_field("probe", fields.next())?,
            }),
            "publish" => {
                let client = client_field("publish", fields.next())?;
                let count: usize = number("publish", "count", fields.next())?;
                let mut observations = BTreeMap::new();
                for _ in 0..count {
                    let id = number("publish", "subscription id", fields.next())?;
                    let value = number("publish", "value", fields.next())?;
                    observations.insert(id, value);
                }
                if fields.next().is_some() {
                    return Err(malformed("publish", "trailing fields after observations"));
                }
                Ok(Self::Publish {
                    client,
                    observations,
                })
            }
            other => Err(ProtocolError::UnknownType(other.to_owned())),
        }
    }
}

fn malformed(kind: &'static str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed {
        kind,
        reason: reason.into(),
    }
}

fn client_field(kind: &'static str, field: Option<&str>) -> Result<MacAddress, ProtocolError> {
    let raw = field.ok_or_else(|| malformed(kind, "missing client address"))?;
    raw.parse().map_err(|e| malformed(kind, format!("{e}")))
}

fn number<T: std::str::FromStr>(
    kind: &'static str,
    what: &str,
    field: Option<&str>,
) -> Result<T, ProtocolError> {
    let raw = field.ok_or_else(|| malformed(kind, format!("missing {what}")))?;
    raw.parse()
        .map_err(|_| malformed(kind, format!("invalid {what} '{raw}'")))
}

// ── Outbound control lines ──────────────────────────────────────────

/// Handler names on the agent's control element.
pub mod handler {
    pub const SUBSCRIPTIONS: &str = "subscriptions";
    pub const ADD_VAP: &str = "add_vap";
    pub const REMOVE_VAP: &str = "remove_vap";
    pub const SET_VAP: &str = "set_vap";
    pub const FLOWS: &str = "flows";
}

pub fn write_line(handler: &str, args: &str) -> String {
    format!("WRITE odinagent.{handler} {args}\n")
}

/// `<client> <ip> <bssid> <ssid>...`; an unknown IP goes out as 0.0.0.0.
pub fn vap_args(client: &Client) -> String {
    let lvap = client.lvap();
    let ip = client.ip().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let mut args = format!("{} {ip} {}", client.mac(), lvap.bssid);
    for ssid in &lvap.ssids {
        let _ = write!(args, " {ssid}");
    }
    args
}

/// `<count> (<priority> <in port> <src|dst> <ip> <out port> <idle secs> )*`
pub fn flow_args(program: &ForwardingProgram) -> String {
    let mut args = format!("{}", program.rules.len());
    for rule in &program.rules {
        let (direction, ip) = match rule.matcher {
            FlowMatch::SourceIp(ip) => ("src", ip),
            FlowMatch::DestinationIp(ip) => ("dst", ip),
        };
        let _ = write!(
            args,
            " {} {} {direction} {ip} {} {}",
            rule.priority, rule.in_port, rule.out_port, rule.idle_timeout_secs
        );
    }
    args
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use odin_core::{Lvap, LvapAssigner, DefaultLvapAssigner};
    use pretty_assertions::assert_eq;

    fn mac(s: &str) -> MacAddress {
        s.parse().unwrap()
    }

    #[test]
    fn parses_ping_and_probe() {
        assert_eq!(AgentMessage::parse("ping\n").unwrap(), AgentMessage::Ping);
        assert_eq!(
            AgentMessage::parse("probe AA:BB:CC:DD:EE:FF").unwrap(),
            AgentMessage::Probe {
                client: mac("aa:bb:cc:dd:ee:ff")
            }
        );
    }

    #[test]
    fn parses_publish_observations() {
        let msg = AgentMessage::parse("publish aa:bb:cc:dd:ee:ff 2 1 170 4 -3").unwrap();
        assert_eq!(
            msg,
            AgentMessage::Publish {
                client: mac("aa:bb:cc:dd:ee:ff"),
                observations: BTreeMap::from([(1, 170), (4, -3)]),
            }
        );
    }

    #[test]
    fn rejects_malformed_datagrams() {
        assert_eq!(AgentMessage::parse("   "), Err(ProtocolError::Empty));
        assert_eq!(
            AgentMessage::parse("hello"),
            Err(ProtocolError::UnknownType("hello".into()))
        );
        assert!(AgentMessage::parse("probe").is_err());
        assert!(AgentMessage::parse("probe zz:bb:cc:dd:ee:ff").is_err());
        assert!(AgentMessage::parse("publish aa:bb:cc:dd:ee:ff 2 1 170").is_err());
        assert!(AgentMessage::parse("publish aa:bb:cc:dd:ee:ff 1 1 170 9").is_err());
        assert!(AgentMessage::parse("publish aa:bb:cc:dd:ee:ff x").is_err());
    }

    #[test]
    fn formats_vap_and_flow_lines() {
        let client = Client::new(
            mac("aa:bb:cc:dd:ee:ff"),
            None,
            Lvap::new(mac("00:1b:b3:dd:ee:ff"), "odin"),
        );
        assert_eq!(
            write_line(handler::ADD_VAP, &vap_args(&client)),
            "WRITE odinagent.add_vap aa:bb:cc:dd:ee:ff 0.0.0.0 00:1b:b3:dd:ee:ff odin\n"
        );

        let program = DefaultLvapAssigner::default()
            .default_forwarding_program("192.168.1.10".parse().unwrap());
        assert_eq!(
            flow_args(&program),
            "2 200 1 dst 192.168.1.10 2 0 200 2 src 192.168.1.10 1 0"
        );
    }
}
