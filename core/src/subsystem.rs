//! Pass-step trait and the context each step runs in.
//!
//! RULE: Every reconciliation step implements PassStep.
//! The engine calls run() on each registered step in registration order,
//! once per pass. Execution order is fixed and documented in engine.rs.
//!
//! Steps see the same `PassSnapshot`. When a step writes a record through
//! the gateway it also updates the snapshot, so later steps in the same pass
//! see the new state without re-reading.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    config::EngineConfig,
    dedup::AlertDedup,
    error::{EngineError, EngineResult},
    event::EngineEvent,
    gateway::{PersistenceGateway, RecordKind},
    model::{Lead, Subscriber, Trial},
    types::EntityId,
};

/// The records a pass works on, read once at the start of the pass.
#[derive(Debug, Clone, Default)]
pub struct PassSnapshot {
    pub clients: Vec<Subscriber>,
    pub trials: Vec<Trial>,
    pub leads: Vec<Lead>,
}

/// A failure confined to one record. The pass moves on to the next record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EntityFailure {
    pub step: &'static str,
    pub kind: RecordKind,
    pub id: EntityId,
    pub error: String,
}

/// What one pass did.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PassReport {
    pub trials_expired: usize,
    pub trials_reopened: usize,
    pub clients_set_pending: usize,
    pub leads_created: usize,
    pub duplicates_skipped: usize,
    pub tolerance_breaches: usize,
    pub failures: Vec<EntityFailure>,
    pub events: Vec<EngineEvent>,
}

impl PassReport {
    /// Number of subscriber/trial records the pass wrote.
    pub fn records_changed(&self) -> usize {
        self.trials_expired + self.trials_reopened + self.clients_set_pending
    }
}

pub struct PassContext<'a> {
    pub gateway: &'a dyn PersistenceGateway,
    pub config: &'a EngineConfig,
    pub dedup: &'a mut AlertDedup,
    pub snapshot: &'a mut PassSnapshot,
    pub report: &'a mut PassReport,
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl PassContext<'_> {
    /// Record a per-record failure and keep going.
    pub fn isolate(&mut self, step: &'static str, kind: RecordKind, id: &str, err: EngineError) {
        log::warn!("{step}: {kind} '{id}' skipped: {err}");
        self.report.failures.push(EntityFailure {
            step,
            kind,
            id: id.to_string(),
            error: err.to_string(),
        });
    }
}

/// The contract every reconciliation step must fulfill.
pub trait PassStep {
    /// Unique stable name for this step.
    fn name(&self) -> &'static str;

    /// Called once per pass by the engine.
    ///
    /// Returns the events to publish. An `Err` aborts the whole pass, so
    /// per-record problems go through `PassContext::isolate` instead.
    fn run(&mut self, ctx: &mut PassContext<'_>) -> EngineResult<Vec<EngineEvent>>;
}
