//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;
use subledger_core::{
    bus::RecordingSink,
    clock::EngineClock,
    config::EngineConfig,
    engine::ReconEngine,
    error::{EngineError, EngineResult},
    gateway::{PersistenceGateway, RecordKind},
    model::{
        Lead, RevenueTransaction, Subscriber, SystemLogEntry, SystemLogKind, Trial, TrialStatus,
    },
    store::Store,
};

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Test engine pinned to `today`, with a recording sink attached.
pub fn build(today: NaiveDate) -> (ReconEngine, RecordingSink) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = ReconEngine::build_test(today).expect("build_test failed");
    let sink = RecordingSink::new();
    engine.subscribe(Box::new(sink.clone()));
    (engine, sink)
}

pub fn subscriber(name: &str, plan: &str, expiration: &str) -> Subscriber {
    Subscriber {
        name: name.into(),
        phone: "(11) 98765-4321".into(),
        plan: plan.into(),
        price: 30.0,
        activation_date: "2025-01-15".into(),
        expiration_date: expiration.into(),
        server: Some("alpha".into()),
        ..Default::default()
    }
}

/// Write a subscriber straight to the store, without a ledger entry.
pub fn seed_client(engine: &ReconEngine, client: Subscriber) -> Subscriber {
    engine.gateway().add_client(client).expect("seed client")
}

pub fn trial(name: &str, phone: &str, ends_at: DateTime<Utc>) -> Trial {
    Trial {
        id: String::new(),
        client_name: name.into(),
        phone: phone.into(),
        ends_at,
        status: TrialStatus::Active,
    }
}

/// A trial that ended `days` days before the engine's current instant.
pub fn seed_trial_ended(engine: &ReconEngine, name: &str, phone: &str, days: i64) -> Trial {
    let ends_at = engine.clock.now() - Duration::days(days);
    engine
        .gateway()
        .add_trial(trial(name, phone, ends_at))
        .expect("seed trial")
}

pub fn log_entries(engine: &ReconEngine, kind: SystemLogKind) -> Vec<SystemLogEntry> {
    engine
        .gateway()
        .list_system_log()
        .unwrap()
        .into_iter()
        .filter(|e| e.kind == kind)
        .collect()
}

pub fn client_by_id(engine: &ReconEngine, id: &str) -> Subscriber {
    engine
        .gateway()
        .list_clients()
        .unwrap()
        .into_iter()
        .find(|c| c.id == id)
        .expect("client present")
}

/// Store wrapper that refuses updates to records with the given names, and
/// optionally every trial listing or system-log write.
pub struct FlakyGateway {
    pub inner: Store,
    pub broken_clients: HashSet<String>,
    pub broken_trials: HashSet<String>,
    /// When set, listing trials fails outright.
    pub trials_unreadable: bool,
    /// When set, every system-log write fails.
    pub logs_unwritable: bool,
}

impl FlakyGateway {
    pub fn new() -> Self {
        let inner = Store::in_memory().unwrap();
        inner.migrate().unwrap();
        Self {
            inner,
            broken_clients: HashSet::new(),
            broken_trials: HashSet::new(),
            trials_unreadable: false,
            logs_unwritable: false,
        }
    }

    fn refuse(kind: RecordKind, id: &str) -> EngineError {
        EngineError::Gateway {
            op: "update",
            kind,
            reason: format!("simulated outage for {id}"),
        }
    }
}

impl PersistenceGateway for FlakyGateway {
    fn list_clients(&self) -> EngineResult<Vec<Subscriber>> {
        self.inner.list_clients()
    }
    fn add_client(&self, client: Subscriber) -> EngineResult<Subscriber> {
        self.inner.add_client(client)
    }
    fn update_client(&self, client: &Subscriber) -> EngineResult<()> {
        if self.broken_clients.contains(&client.name) {
            return Err(Self::refuse(RecordKind::Client, &client.id));
        }
        self.inner.update_client(client)
    }
    fn delete_client(&self, id: &str) -> EngineResult<()> {
        self.inner.delete_client(id)
    }

    fn list_leads(&self) -> EngineResult<Vec<Lead>> {
        self.inner.list_leads()
    }
    fn add_lead(&self, lead: Lead) -> EngineResult<Lead> {
        self.inner.add_lead(lead)
    }
    fn update_lead(&self, lead: &Lead) -> EngineResult<()> {
        self.inner.update_lead(lead)
    }
    fn delete_lead(&self, id: &str) -> EngineResult<()> {
        self.inner.delete_lead(id)
    }

    fn list_trials(&self) -> EngineResult<Vec<Trial>> {
        if self.trials_unreadable {
            return Err(EngineError::Gateway {
                op: "list",
                kind: RecordKind::Trial,
                reason: "simulated outage".into(),
            });
        }
        self.inner.list_trials()
    }
    fn add_trial(&self, trial: Trial) -> EngineResult<Trial> {
        self.inner.add_trial(trial)
    }
    fn update_trial(&self, trial: &Trial) -> EngineResult<()> {
        if self.broken_trials.contains(&trial.client_name) {
            return Err(Self::refuse(RecordKind::Trial, &trial.id));
        }
        self.inner.update_trial(trial)
    }
    fn delete_trial(&self, id: &str) -> EngineResult<()> {
        self.inner.delete_trial(id)
    }

    fn list_transactions(&self) -> EngineResult<Vec<RevenueTransaction>> {
        self.inner.list_transactions()
    }
    fn add_transaction(&self, txn: RevenueTransaction) -> EngineResult<RevenueTransaction> {
        self.inner.add_transaction(txn)
    }
    fn update_transaction(&self, txn: &RevenueTransaction) -> EngineResult<()> {
        self.inner.update_transaction(txn)
    }
    fn delete_transaction(&self, id: &str) -> EngineResult<()> {
        self.inner.delete_transaction(id)
    }

    fn list_system_log(&self) -> EngineResult<Vec<SystemLogEntry>> {
        self.inner.list_system_log()
    }
    fn add_system_log(&self, entry: SystemLogEntry) -> EngineResult<SystemLogEntry> {
        if self.logs_unwritable {
            return Err(EngineError::Gateway {
                op: "add",
                kind: RecordKind::SystemLog,
                reason: "simulated outage".into(),
            });
        }
        self.inner.add_system_log(entry)
    }
    fn update_system_log(&self, entry: &SystemLogEntry) -> EngineResult<()> {
        self.inner.update_system_log(entry)
    }
    fn delete_system_log(&self, id: &str) -> EngineResult<()> {
        self.inner.delete_system_log(id)
    }
}

/// Engine over a `FlakyGateway` that refuses updates to the named records.
pub fn build_flaky(
    today: NaiveDate,
    broken_clients: &[&str],
    broken_trials: &[&str],
) -> ReconEngine {
    let mut gateway = FlakyGateway::new();
    gateway.broken_clients = broken_clients.iter().map(|s| s.to_string()).collect();
    gateway.broken_trials = broken_trials.iter().map(|s| s.to_string()).collect();
    engine_over(gateway, today)
}

pub fn engine_over(gateway: FlakyGateway, today: NaiveDate) -> ReconEngine {
    ReconEngine::build(
        Box::new(gateway),
        EngineConfig::default_test(),
        EngineClock::fixed_on(today),
    )
}
