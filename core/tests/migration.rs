//! Integration tests for pipeline migration.
//!
//! Tests verify:
//! 1. A subscriber overdue 12 days becomes exactly one ex-client lead
//! 2. Re-running the pass never creates a second lead for the same subscriber
//! 3. Subscribers under the 10-day threshold, inactive, or with an
//!    unreadable expiration stay put
//! 4. A trial idle for 6 days becomes one new/auto lead
//! 5. A trial matching an existing lead by phone or name is a duplicate

mod common;

use common::*;
use subledger_core::{
    event::{EngineEvent, MigrationKind},
    model::{
        Lead, LeadCategory, LeadSource, LifecycleStatus, PaymentStatus, SystemLogKind, TrialStatus,
    },
};

fn migration_alerts(events: &[EngineEvent], wanted: MigrationKind) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, EngineEvent::MigrationAlert { kind, .. } if *kind == wanted))
        .count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: overdue 12 days → one lead plus one client_migration entry
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn overdue_subscriber_becomes_ex_client_lead() {
    let (mut engine, sink) = build(ymd(2025, 3, 27));
    let client = seed_client(
        &engine,
        subscriber("Carla Souza", "Mensal", "2025-03-15"),
    );

    let report = engine.run_pass().unwrap();
    assert_eq!(report.leads_created, 1);
    assert!(report.failures.is_empty());

    let leads = engine.gateway().list_leads().unwrap();
    assert_eq!(leads.len(), 1);
    let lead = &leads[0];
    assert_eq!(lead.category, LeadCategory::ExClient);
    assert_eq!(lead.source, LeadSource::Auto);
    assert!(lead.from_migration);
    assert_eq!(lead.origin_client_id.as_deref(), Some(client.id.as_str()));
    assert_eq!(lead.name, "Carla Souza");

    // The overdue step ran first, so the snapshot captures "pending".
    let snapshot = lead.snapshot.as_ref().expect("plan snapshot");
    assert_eq!(snapshot.plan, "Mensal");
    assert_eq!(snapshot.expiration_date, "2025-03-15");
    assert_eq!(snapshot.payment_status, PaymentStatus::Pending);
    assert!(lead
        .migration_reason
        .as_deref()
        .is_some_and(|r| r.contains("12 days")));

    let logs = log_entries(&engine, SystemLogKind::ClientMigration);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].entity_id.as_deref(), Some(client.id.as_str()));

    assert_eq!(migration_alerts(&sink.events(), MigrationKind::Migrated), 1);

    // Migration does not deactivate the subscriber.
    let stored = client_by_id(&engine, &client.id);
    assert_eq!(stored.status, LifecycleStatus::Active);
    assert_eq!(stored.payment_status, PaymentStatus::Pending);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: migration is idempotent across passes
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn repeated_passes_create_exactly_one_lead() {
    let (mut engine, sink) = build(ymd(2025, 3, 27));
    seed_client(&engine, subscriber("Carla Souza", "Mensal", "2025-03-15"));

    engine.run_pass().unwrap();
    let second = engine.run_pass().unwrap();
    let third = engine.run_pass().unwrap();

    assert_eq!(second.leads_created, 0);
    assert_eq!(third.leads_created, 0);
    assert_eq!(engine.gateway().list_leads().unwrap().len(), 1);
    assert_eq!(log_entries(&engine, SystemLogKind::ClientMigration).len(), 1);

    // One informational duplicate notice, then silence.
    assert_eq!(second.duplicates_skipped, 1);
    assert_eq!(third.duplicates_skipped, 0);
    assert_eq!(migration_alerts(&sink.events(), MigrationKind::Duplicate), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: thresholds and lifecycle
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn nine_days_overdue_is_pending_but_not_migrated() {
    let (mut engine, _sink) = build(ymd(2025, 3, 24));
    let mut draft = subscriber("Davi Lima", "Mensal", "2025-03-15");
    draft.payment_status = PaymentStatus::Paid;
    let client = seed_client(&engine, draft);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.clients_set_pending, 1);
    assert_eq!(report.leads_created, 0);
    assert!(engine.gateway().list_leads().unwrap().is_empty());
    assert_eq!(
        client_by_id(&engine, &client.id).payment_status,
        PaymentStatus::Pending
    );
}

#[test]
fn inactive_subscriber_is_ignored() {
    let (mut engine, _sink) = build(ymd(2025, 6, 1));
    let mut draft = subscriber("Elisa Prado", "Mensal", "2025-03-15");
    draft.status = LifecycleStatus::Inactive;
    draft.payment_status = PaymentStatus::Paid;
    let client = seed_client(&engine, draft);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.clients_set_pending, 0);
    assert_eq!(report.leads_created, 0);
    assert_eq!(
        client_by_id(&engine, &client.id).payment_status,
        PaymentStatus::Paid
    );
}

#[test]
fn two_digit_year_expiration_is_left_alone() {
    let (mut engine, _sink) = build(ymd(2025, 3, 10));
    let mut draft = subscriber("Gil Ramos", "Mensal", "15/04/25");
    draft.payment_status = PaymentStatus::Paid;
    let client = seed_client(&engine, draft);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.clients_set_pending, 0);
    assert_eq!(report.tolerance_breaches, 0);
    assert_eq!(report.leads_created, 0);
    assert!(log_entries(&engine, SystemLogKind::ClientMigration).is_empty());
    assert_eq!(
        client_by_id(&engine, &client.id).payment_status,
        PaymentStatus::Paid
    );
}

#[test]
fn later_passes_keep_a_single_migrated_lead() {
    let (mut engine, _sink) = build(ymd(2025, 3, 27));
    let client = seed_client(&engine, subscriber("Carla Souza", "Mensal", "2025-03-15"));
    engine.run_pass().unwrap();

    // A manual lead with the same name does not count as the migration record,
    // but the migrated one already in the store does.
    engine
        .add_lead(Lead::manual("Carla Souza", "", engine.clock.now()))
        .unwrap();
    engine.clock.advance_days(3);
    engine.run_pass().unwrap();

    let migrated: Vec<_> = engine
        .gateway()
        .list_leads()
        .unwrap()
        .into_iter()
        .filter(|l| l.is_migrated_from(&client.id))
        .collect();
    assert_eq!(migrated.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: idle trial → new lead
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn trial_idle_six_days_becomes_new_lead() {
    let (mut engine, sink) = build(ymd(2025, 3, 27));
    let trial = seed_trial_ended(&engine, "Fabio Reis", "21 99999-0000", 6);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.trials_expired, 1);
    assert_eq!(report.leads_created, 1);

    let leads = engine.gateway().list_leads().unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].category, LeadCategory::New);
    assert_eq!(leads[0].source, LeadSource::Auto);
    assert!(leads[0].from_migration);
    assert!(leads[0].origin_client_id.is_none());
    assert!(leads[0].snapshot.is_none());

    let logs = log_entries(&engine, SystemLogKind::TrialMigration);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].entity_id.as_deref(), Some(trial.id.as_str()));

    let stored = engine.gateway().list_trials().unwrap();
    assert_eq!(stored[0].status, TrialStatus::Expired);
    assert_eq!(migration_alerts(&sink.events(), MigrationKind::Migrated), 1);
}

#[test]
fn trial_idle_four_days_is_not_migrated() {
    let (mut engine, _sink) = build(ymd(2025, 3, 27));
    seed_trial_ended(&engine, "Gabi Nunes", "21 98888-1111", 4);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.trials_expired, 1);
    assert_eq!(report.leads_created, 0);
    assert!(engine.gateway().list_leads().unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 5: matching leads block trial migration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn trial_matching_lead_phone_is_duplicate() {
    let (mut engine, sink) = build(ymd(2025, 3, 27));
    engine
        .add_lead(Lead::manual("Someone Else", "(21) 99999-0000", engine.clock.now()))
        .unwrap();
    seed_trial_ended(&engine, "Fabio Reis", "21999990000", 6);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.leads_created, 0);
    assert_eq!(report.duplicates_skipped, 1);
    assert_eq!(engine.gateway().list_leads().unwrap().len(), 1);
    assert!(log_entries(&engine, SystemLogKind::TrialMigration).is_empty());
    assert_eq!(migration_alerts(&sink.events(), MigrationKind::Duplicate), 1);
}

#[test]
fn trial_matching_lead_name_is_duplicate() {
    let (mut engine, _sink) = build(ymd(2025, 3, 27));
    engine
        .add_lead(Lead::manual("  fabio REIS ", "", engine.clock.now()))
        .unwrap();
    seed_trial_ended(&engine, "Fabio Reis", "", 6);

    let report = engine.run_pass().unwrap();
    assert_eq!(report.leads_created, 0);
    assert_eq!(report.duplicates_skipped, 1);
}

#[test]
fn converted_trial_never_migrates() {
    let (mut engine, _sink) = build(ymd(2025, 3, 27));
    let mut t = trial("Hugo Alves", "", engine.clock.now() - chrono::Duration::days(30));
    t.status = TrialStatus::Converted;
    engine.add_trial(t).unwrap();

    let report = engine.run_pass().unwrap();
    assert_eq!(report.leads_created, 0);
    assert_eq!(report.trials_expired, 0);
}
