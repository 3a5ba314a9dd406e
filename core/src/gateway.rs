//! The persistence gateway contract.
//!
//! RULE: the engine never talks to storage except through this trait.
//! Every call is atomic and may fail; a failed call leaves nothing
//! half-written that the engine would treat as committed.
//!
//! `add_*` returns the stored record with its id filled in. A record passed
//! with an empty id gets a fresh one from the gateway.

use serde::{Deserialize, Serialize};

use crate::{
    error::EngineResult,
    model::{Lead, RevenueTransaction, Subscriber, SystemLogEntry, Trial},
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Client,
    Lead,
    Trial,
    Transaction,
    SystemLog,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Lead => "lead",
            Self::Trial => "trial",
            Self::Transaction => "transaction",
            Self::SystemLog => "system_log",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait PersistenceGateway {
    // ── Subscribers ────────────────────────────────
    fn list_clients(&self) -> EngineResult<Vec<Subscriber>>;
    fn add_client(&self, client: Subscriber) -> EngineResult<Subscriber>;
    fn update_client(&self, client: &Subscriber) -> EngineResult<()>;
    fn delete_client(&self, id: &str) -> EngineResult<()>;

    // ── Leads ──────────────────────────────────────
    fn list_leads(&self) -> EngineResult<Vec<Lead>>;
    fn add_lead(&self, lead: Lead) -> EngineResult<Lead>;
    fn update_lead(&self, lead: &Lead) -> EngineResult<()>;
    fn delete_lead(&self, id: &str) -> EngineResult<()>;

    // ── Trials ─────────────────────────────────────
    fn list_trials(&self) -> EngineResult<Vec<Trial>>;
    fn add_trial(&self, trial: Trial) -> EngineResult<Trial>;
    fn update_trial(&self, trial: &Trial) -> EngineResult<()>;
    fn delete_trial(&self, id: &str) -> EngineResult<()>;

    // ── Revenue ledger ─────────────────────────────
    fn list_transactions(&self) -> EngineResult<Vec<RevenueTransaction>>;
    fn add_transaction(&self, txn: RevenueTransaction) -> EngineResult<RevenueTransaction>;
    fn update_transaction(&self, txn: &RevenueTransaction) -> EngineResult<()>;
    fn delete_transaction(&self, id: &str) -> EngineResult<()>;

    // ── System log ─────────────────────────────────
    fn list_system_log(&self) -> EngineResult<Vec<SystemLogEntry>>;
    fn add_system_log(&self, entry: SystemLogEntry) -> EngineResult<SystemLogEntry>;
    fn update_system_log(&self, entry: &SystemLogEntry) -> EngineResult<()>;
    fn delete_system_log(&self, id: &str) -> EngineResult<()>;
}
