#![allow(clippy::unwrap_used)]
// Integration tests for LVAP assignment and migration through `Master`.

mod common;

use common::{Op, ip, mac, master};
use odin_core::HandoffOutcome;
use pretty_assertions::assert_eq;

const STA: &str = "aa:aa:aa:aa:aa:aa";
const AP1: &str = "10.0.0.1";
const AP2: &str = "10.0.0.2";

// ── First assignment ────────────────────────────────────────────────

#[tokio::test]
async fn test_probe_assigns_new_client_to_probing_agent() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    journal.clear();

    let outcome = master.receive_probe(ip(AP1), mac(STA));

    assert_eq!(outcome, Some(HandoffOutcome::Assigned));
    let client = master.client(mac(STA)).unwrap();
    assert_eq!(client.agent().unwrap().address(), ip(AP1));
    assert!(client.ip().is_none());
    assert_eq!(journal.for_agent(ip(AP1)), vec![Op::Program, Op::Add(mac(STA))]);
}

#[tokio::test]
async fn test_program_failure_does_not_abort_assignment() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    journal.clear();
    journal.fail_programs();

    let outcome = master.receive_probe(ip(AP1), mac(STA));

    assert_eq!(outcome, Some(HandoffOutcome::Assigned));
    assert_eq!(journal.for_agent(ip(AP1)), vec![Op::Add(mac(STA))]);
    assert!(master.client(mac(STA)).unwrap().agent().is_some());
}

// ── Idempotence ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_repeated_handoff_to_same_agent_is_noop() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    master.receive_probe(ip(AP1), mac(STA));
    journal.clear();

    for _ in 0..3 {
        assert_eq!(master.handoff(mac(STA), ip(AP1)), HandoffOutcome::AlreadyAssigned);
    }
    master.quiesce().await;

    assert!(journal.all().is_empty());
    assert_eq!(master.client(mac(STA)).unwrap().agent().unwrap().address(), ip(AP1));
}

#[tokio::test]
async fn test_second_probe_of_assigned_client_does_nothing() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    master.receive_ping(ip(AP2));
    master.receive_probe(ip(AP1), mac(STA));
    journal.clear();

    assert_eq!(master.receive_probe(ip(AP2), mac(STA)), None);
    assert!(journal.all().is_empty());
    assert_eq!(master.client(mac(STA)).unwrap().agent().unwrap().address(), ip(AP1));
}

// ── Migration ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_migration_moves_pointer_before_remote_tasks_run() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    master.receive_ping(ip(AP2));
    master.receive_probe(ip(AP1), mac(STA));
    journal.clear();

    let outcome = master.handoff(mac(STA), ip(AP2));

    // Current-thread runtime: pooled jobs cannot have run yet.
    assert_eq!(outcome, HandoffOutcome::Migrated { from: ip(AP1) });
    assert_eq!(master.client(mac(STA)).unwrap().agent().unwrap().address(), ip(AP2));
    assert_eq!(journal.all(), vec![(ip(AP2), Op::Program)]);

    master.quiesce().await;

    let mut lvap_ops = journal.lvap_ops();
    lvap_ops.sort_by_key(|(addr, _)| *addr);
    assert_eq!(
        lvap_ops,
        vec![(ip(AP1), Op::Remove(mac(STA))), (ip(AP2), Op::Add(mac(STA)))]
    );
}

#[tokio::test]
async fn test_back_to_back_migrations_last_pointer_wins() {
    let (master, journal) = master();
    for ap in [AP1, AP2, "10.0.0.3"] {
        master.receive_ping(ip(ap));
    }
    master.receive_probe(ip(AP1), mac(STA));
    journal.clear();

    master.handoff(mac(STA), ip(AP2));
    master.handoff(mac(STA), ip("10.0.0.3"));
    master.quiesce().await;

    assert_eq!(
        master.client(mac(STA)).unwrap().agent().unwrap().address(),
        ip("10.0.0.3")
    );
    // Both requests' remote jobs still ran.
    assert_eq!(journal.lvap_ops().len(), 4);
}

// ── Aborted requests ────────────────────────────────────────────────

#[tokio::test]
async fn test_handoff_rejects_bad_arguments_and_unknown_entities() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    master.receive_probe(ip(AP1), mac(STA));
    journal.clear();

    assert_eq!(
        master.handoff(mac("ff:ff:ff:ff:ff:ff"), ip(AP1)),
        HandoffOutcome::InvalidArgument
    );
    assert_eq!(master.handoff(mac(STA), ip("0.0.0.0")), HandoffOutcome::InvalidArgument);
    assert_eq!(master.handoff(mac(STA), ip("10.9.9.9")), HandoffOutcome::UnknownAgent);
    assert_eq!(
        master.handoff(mac("aa:aa:aa:aa:aa:ab"), ip(AP1)),
        HandoffOutcome::UnknownClient
    );
    assert!(journal.all().is_empty());
}

#[tokio::test]
async fn test_probe_filters_group_addresses_and_untracked_agents() {
    let (master, _journal) = master();
    master.receive_ping(ip(AP1));

    assert_eq!(master.receive_probe(ip(AP1), mac("ff:ff:ff:ff:ff:ff")), None);
    assert_eq!(master.receive_probe(ip(AP1), mac("01:00:5e:00:00:01")), None);
    assert_eq!(master.receive_probe(ip(AP2), mac(STA)), None);
    assert!(master.clients().is_empty());
}

#[tokio::test]
async fn test_probe_from_zero_address_creates_no_client() {
    let (master, journal) = master();
    master.receive_ping(ip(AP1));
    let zero = mac("00:00:00:00:00:00");

    assert_eq!(master.receive_probe(ip(AP1), zero), None);
    assert_eq!(master.receive_probe(ip(AP1), zero), None);

    assert!(master.client(zero).is_none());
    assert!(master.clients().is_empty());
    assert_eq!(journal.for_agent(ip(AP1)), vec![Op::Subscriptions("0 ".into())]);
}

#[tokio::test]
async fn test_probe_for_known_unassigned_client_reuses_record() {
    let (master, _journal) = master();
    master.receive_ping(ip(AP1));
    master.load_authorized_clients([odin_core::AuthorizedClient {
        mac: mac(STA),
        ip: ip("192.168.1.20"),
        bssid: mac("00:1b:b3:aa:aa:aa"),
        ssid: "lab".into(),
    }]);
    let before = master.client(mac(STA)).unwrap();

    assert_eq!(master.receive_probe(ip(AP1), mac(STA)), Some(HandoffOutcome::Assigned));

    let after = master.client(mac(STA)).unwrap();
    assert!(std::sync::Arc::ptr_eq(&before, &after));
    assert_eq!(after.lvap().ssids, vec!["lab".to_owned()]);
    assert_eq!(after.forwarding_program().rules.len(), 2);
}
