//! SQLite persistence gateway.
//!
//! RULE: Only the store talks to the database.
//! The engine calls `PersistenceGateway` methods and never executes SQL itself.

use rusqlite::{Connection, Row};

use crate::{
    error::{EngineError, EngineResult},
    gateway::{PersistenceGateway, RecordKind},
    model::{Lead, RevenueTransaction, Subscriber, SystemLogEntry, Trial},
    types::EntityId,
};

mod client;
mod lead;
mod ledger;
mod system_log;
mod trial;

pub struct Store {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl Store {
    pub fn open(path: &str) -> EngineResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> EngineResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a new, isolated database.
    pub fn reopen(&self) -> EngineResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> EngineResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Turn "no row touched" into NotFound.
    fn expect_one(changed: usize, kind: RecordKind, id: &str) -> EngineResult<()> {
        if changed == 0 {
            return Err(EngineError::NotFound {
                kind,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Fresh UUID when the caller left the id empty.
fn assign_id(id: &mut EntityId) {
    if id.is_empty() {
        *id = uuid::Uuid::new_v4().to_string();
    }
}

/// Read a text column through one of the model's `parse` functions.
fn text_column<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value {raw:?}").into(),
        )
    })
}

impl PersistenceGateway for Store {
    fn list_clients(&self) -> EngineResult<Vec<Subscriber>> {
        self.all_clients()
    }

    fn add_client(&self, mut client: Subscriber) -> EngineResult<Subscriber> {
        assign_id(&mut client.id);
        self.insert_client(&client)?;
        Ok(client)
    }

    fn update_client(&self, client: &Subscriber) -> EngineResult<()> {
        let changed = self.write_client(client)?;
        Self::expect_one(changed, RecordKind::Client, &client.id)
    }

    fn delete_client(&self, id: &str) -> EngineResult<()> {
        let changed = self.remove_client(id)?;
        Self::expect_one(changed, RecordKind::Client, id)
    }

    fn list_leads(&self) -> EngineResult<Vec<Lead>> {
        self.all_leads()
    }

    fn add_lead(&self, mut lead: Lead) -> EngineResult<Lead> {
        assign_id(&mut lead.id);
        self.insert_lead(&lead)?;
        Ok(lead)
    }

    fn update_lead(&self, lead: &Lead) -> EngineResult<()> {
        let changed = self.write_lead(lead)?;
        Self::expect_one(changed, RecordKind::Lead, &lead.id)
    }

    fn delete_lead(&self, id: &str) -> EngineResult<()> {
        let changed = self.remove_lead(id)?;
        Self::expect_one(changed, RecordKind::Lead, id)
    }

    fn list_trials(&self) -> EngineResult<Vec<Trial>> {
        self.all_trials()
    }

    fn add_trial(&self, mut trial: Trial) -> EngineResult<Trial> {
        assign_id(&mut trial.id);
        self.insert_trial(&trial)?;
        Ok(trial)
    }

    fn update_trial(&self, trial: &Trial) -> EngineResult<()> {
        let changed = self.write_trial(trial)?;
        Self::expect_one(changed, RecordKind::Trial, &trial.id)
    }

    fn delete_trial(&self, id: &str) -> EngineResult<()> {
        let changed = self.remove_trial(id)?;
        Self::expect_one(changed, RecordKind::Trial, id)
    }

    fn list_transactions(&self) -> EngineResult<Vec<RevenueTransaction>> {
        self.all_transactions()
    }

    fn add_transaction(&self, mut txn: RevenueTransaction) -> EngineResult<RevenueTransaction> {
        assign_id(&mut txn.id);
        self.insert_transaction(&txn)?;
        Ok(txn)
    }

    fn update_transaction(&self, txn: &RevenueTransaction) -> EngineResult<()> {
        let changed = self.write_transaction(txn)?;
        Self::expect_one(changed, RecordKind::Transaction, &txn.id)
    }

    fn delete_transaction(&self, id: &str) -> EngineResult<()> {
        let changed = self.remove_transaction(id)?;
        Self::expect_one(changed, RecordKind::Transaction, id)
    }

    fn list_system_log(&self) -> EngineResult<Vec<SystemLogEntry>> {
        self.all_system_log()
    }

    fn add_system_log(&self, mut entry: SystemLogEntry) -> EngineResult<SystemLogEntry> {
        assign_id(&mut entry.id);
        self.insert_system_log(&entry)?;
        Ok(entry)
    }

    fn update_system_log(&self, entry: &SystemLogEntry) -> EngineResult<()> {
        let changed = self.write_system_log(entry)?;
        Self::expect_one(changed, RecordKind::SystemLog, &entry.id)
    }

    fn delete_system_log(&self, id: &str) -> EngineResult<()> {
        let changed = self.remove_system_log(id)?;
        Self::expect_one(changed, RecordKind::SystemLog, id)
    }
}
