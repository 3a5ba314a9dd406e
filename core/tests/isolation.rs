//! Integration tests for per-record failure isolation.
//!
//! Tests verify:
//! 1. One subscriber's failed update does not stop the rest of the pass
//! 2. One trial's failed update is reported and retried next pass
//! 3. A collection that cannot be read fails the whole pass
//! 4. User operations propagate gateway errors
//! 5. A migration whose log write fails still stands and is announced

mod common;

use common::*;
use subledger_core::{
    bus::RecordingSink,
    error::EngineError,
    event::{EngineEvent, MigrationKind},
    gateway::RecordKind,
    model::{PaymentStatus, Subscriber, TrialStatus},
};

fn paid(name: &str, expiration: &str) -> Subscriber {
    let mut s = subscriber(name, "Mensal", expiration);
    s.payment_status = PaymentStatus::Paid;
    s
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: subscriber failure isolated
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failing_subscriber_does_not_block_others() {
    let mut engine = build_flaky(ymd(2025, 3, 27), &["Broken"], &[]);
    let broken = seed_client(&engine, paid("Broken", "2025-03-15"));
    let fine = seed_client(&engine, paid("Fine", "2025-03-15"));

    let report = engine.run_pass().unwrap();

    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.step, "overdue");
    assert_eq!(failure.kind, RecordKind::Client);
    assert_eq!(failure.id, broken.id);
    assert!(failure.error.contains("simulated outage"));

    assert_eq!(report.clients_set_pending, 1);
    assert_eq!(client_by_id(&engine, &fine.id).payment_status, PaymentStatus::Pending);
    assert_eq!(client_by_id(&engine, &broken.id).payment_status, PaymentStatus::Paid);

    // Migration needs no subscriber update, so both still reach the pipeline.
    assert_eq!(report.leads_created, 2);
    // Escalation is skipped for the record whose update failed.
    assert_eq!(report.tolerance_breaches, 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: trial failure isolated and retried
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn failing_trial_is_retried_every_pass() {
    let mut engine = build_flaky(ymd(2025, 3, 10), &[], &["Stuck"]);
    seed_trial_ended(&engine, "Stuck", "", 1);
    seed_trial_ended(&engine, "Moving", "", 1);

    let first = engine.run_pass().unwrap();
    assert_eq!(first.trials_expired, 1);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].kind, RecordKind::Trial);

    let second = engine.run_pass().unwrap();
    assert_eq!(second.trials_expired, 0);
    assert_eq!(second.failures.len(), 1);

    let trials = engine.gateway().list_trials().unwrap();
    let stuck = trials.iter().find(|t| t.client_name == "Stuck").unwrap();
    let moving = trials.iter().find(|t| t.client_name == "Moving").unwrap();
    assert_eq!(stuck.status, TrialStatus::Active);
    assert_eq!(moving.status, TrialStatus::Expired);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: unreadable collection fails the pass
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unreadable_trials_fail_the_pass_and_release_the_gate() {
    let mut gateway = FlakyGateway::new();
    gateway.trials_unreadable = true;
    let mut engine = engine_over(gateway, ymd(2025, 3, 27));
    let client = seed_client(&engine, paid("Ana Costa", "2025-03-15"));

    let err = engine.run_pass().unwrap_err();
    assert!(err.is_persistence());
    assert!(!engine.pass_gate().is_busy());
    assert_eq!(engine.passes_run(), 0);

    // Nothing was written.
    assert_eq!(client_by_id(&engine, &client.id).payment_status, PaymentStatus::Paid);
    assert!(engine.gateway().list_leads().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: user operations propagate
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn renewal_surfaces_gateway_error() {
    let mut engine = build_flaky(ymd(2025, 3, 10), &["Broken"], &[]);
    let broken = seed_client(&engine, paid("Broken", "2025-03-15"));

    let err = engine.renew_client(&broken.id, None).unwrap_err();
    assert!(matches!(err, EngineError::Gateway { kind: RecordKind::Client, .. }));
    assert!(engine.gateway().list_transactions().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: migration log failure
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn migration_stands_when_its_log_cannot_be_written() {
    let mut gateway = FlakyGateway::new();
    gateway.logs_unwritable = true;
    let mut engine = engine_over(gateway, ymd(2025, 3, 27));
    let sink = RecordingSink::new();
    engine.subscribe(Box::new(sink.clone()));

    let client = seed_client(&engine, subscriber("Carla Souza", "Mensal", "2025-03-15"));
    let trial = seed_trial_ended(&engine, "Bia Torres", "11 91234-0000", 6);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.leads_created, 2);

    let migration_failures: Vec<_> = report
        .failures
        .iter()
        .filter(|f| f.step == "migration")
        .collect();
    assert_eq!(migration_failures.len(), 2);
    assert_eq!(migration_failures[0].kind, RecordKind::Client);
    assert_eq!(migration_failures[0].id, client.id);
    assert_eq!(migration_failures[1].kind, RecordKind::Trial);
    assert_eq!(migration_failures[1].id, trial.id);

    let migrated = sink
        .drain()
        .iter()
        .filter(|e| {
            matches!(e, EngineEvent::MigrationAlert { kind: MigrationKind::Migrated, .. })
        })
        .count();
    assert_eq!(migrated, 2);

    // The stored leads keep later passes from migrating again.
    let again = engine.run_pass().unwrap();
    assert_eq!(again.leads_created, 0);
    assert_eq!(engine.gateway().list_leads().unwrap().len(), 2);
}
