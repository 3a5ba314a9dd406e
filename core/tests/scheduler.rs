//! Integration tests for pass scheduling.
//!
//! Tests verify:
//! 1. A manual pass during an in-flight pass is refused
//! 2. A scheduled pass during an in-flight pass is skipped, then runs
//! 3. The periodic task runs on its interval, driven by manual ticks
//! 4. Commands reach the engine through the command surface

mod common;

use chrono::Duration;
use common::*;
use subledger_core::{
    command::{CommandOutcome, UserCommand},
    error::EngineError,
    scheduler::ReconTask,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test 1: single flight for manual triggers
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn manual_pass_while_busy_is_refused() {
    let (mut engine, _sink) = build(ymd(2025, 3, 10));
    let gate = engine.pass_gate();

    let permit = gate.try_acquire().expect("gate free");
    let err = engine.run_pass().unwrap_err();
    assert!(matches!(err, EngineError::PassInProgress));
    assert_eq!(engine.passes_run(), 0);

    drop(permit);
    engine.run_pass().unwrap();
    assert_eq!(engine.passes_run(), 1);
    assert!(!gate.is_busy());
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 2: scheduled trigger skips while busy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn scheduled_pass_while_busy_is_skipped() {
    let (mut engine, _sink) = build(ymd(2025, 3, 10));
    let mut task = ReconTask::new(300);
    let gate = engine.pass_gate();

    let permit = gate.try_acquire().expect("gate free");
    assert!(task.poll(&mut engine).is_none());
    assert!(task.next_due().is_none(), "skipped round must stay due");

    drop(permit);
    assert!(task.poll(&mut engine).expect("due").is_ok());
    assert_eq!(engine.passes_run(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 3: interval
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn task_runs_once_per_interval() {
    let (mut engine, _sink) = build(ymd(2025, 3, 10));
    let mut task = ReconTask::new(300);

    assert!(task.poll(&mut engine).is_some());
    assert!(task.poll(&mut engine).is_none());

    engine.clock.advance(Duration::seconds(299));
    assert!(task.poll(&mut engine).is_none());

    engine.clock.advance(Duration::seconds(1));
    assert!(task.poll(&mut engine).is_some());
    assert_eq!(engine.passes_run(), 2);
}

#[test]
fn day_of_ticks_migrates_a_lapsing_subscriber() {
    let (mut engine, _sink) = build(ymd(2025, 3, 14));
    seed_client(&engine, subscriber("Ana Costa", "Mensal", "2025-03-15"));
    let mut task = ReconTask::new(3600);

    // Twelve simulated days, one poll per hour.
    for _ in 0..(12 * 24) {
        engine.clock.advance(Duration::hours(1));
        if let Some(result) = task.poll(&mut engine) {
            result.unwrap();
        }
    }

    assert_eq!(engine.passes_run(), 12 * 24);
    assert_eq!(engine.projection().leads.len(), 1);
}

// ─────────────────────────────────────────────────────────────────────────────
// Test 4: command surface
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn commands_parse_from_json_and_apply() {
    let (mut engine, _sink) = build(ymd(2025, 3, 10));
    let client = seed_client(&engine, subscriber("Ana Costa", "Mensal", "2025-03-15"));

    let json = format!(r#"{{"cmd":"renew_client","client_id":"{}"}}"#, client.id);
    let cmd: UserCommand = serde_json::from_str(&json).unwrap();
    assert_eq!(cmd.name(), "renew_client");

    match cmd.apply(&mut engine).unwrap() {
        CommandOutcome::Renewed { receipt } => {
            assert_eq!(receipt.client.expiration_date, "2025-04-15");
        }
        other => panic!("unexpected outcome {other:?}"),
    }

    let cmd: UserCommand = serde_json::from_str(r#"{"cmd":"run_pass"}"#).unwrap();
    assert!(matches!(cmd.apply(&mut engine).unwrap(), CommandOutcome::Pass { .. }));

    let cmd: UserCommand = serde_json::from_str(
        r#"{"cmd":"add_lead","name":"Walk-in","phone":"11 90000-0000"}"#,
    )
    .unwrap();
    cmd.apply(&mut engine).unwrap();
    assert_eq!(engine.projection().leads.len(), 1);
}
