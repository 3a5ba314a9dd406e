//! Revenue ledger: append-only log of subscription and renewal money.
//!
//! Status moves one way only:
//!   pending → committed → reverted
//!
//! Reverted entries stay in the log for audit and are ignored by every
//! sum. Nothing in the engine deletes a ledger entry.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    clock::EngineClock,
    dates,
    error::{EngineError, EngineResult},
    expiration,
    gateway::{PersistenceGateway, RecordKind},
    model::{
        RevenueTransaction, Subscriber, SystemLogEntry, SystemLogKind, TransactionKind,
        TransactionStatus,
    },
    types::{DayCount, EntityId},
};

pub const NORMALIZATION_REASON: &str = "date normalization";

/// Caller-supplied content of a new ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub amount: f64,
    pub date: NaiveDate,
    pub cost_snapshot: Option<f64>,
    pub server_snapshot: Option<String>,
    pub pending: bool,
}

impl NewEntry {
    pub fn committed(amount: f64, date: NaiveDate) -> Self {
        Self {
            amount,
            date,
            cost_snapshot: None,
            server_snapshot: None,
            pending: false,
        }
    }

    pub fn with_cost(mut self, cost: Option<f64>, server: Option<String>) -> Self {
        self.cost_snapshot = cost;
        self.server_snapshot = server;
        self
    }

    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizationReport {
    /// Entries re-dated to activation (a new entry plus the original reverted).
    pub corrected: usize,
    /// Stale or duplicate entries reverted without a replacement.
    pub reverted: usize,
}

impl NormalizationReport {
    pub fn changed(&self) -> bool {
        self.corrected + self.reverted > 0
    }
}

/// Write side of the ledger. Every method is one or more gateway calls.
pub struct RevenueLedger<'a> {
    gateway: &'a dyn PersistenceGateway,
    clock: &'a EngineClock,
}

impl<'a> RevenueLedger<'a> {
    pub fn new(gateway: &'a dyn PersistenceGateway, clock: &'a EngineClock) -> Self {
        Self { gateway, clock }
    }

    pub fn add_subscription_entry(
        &self,
        client: &Subscriber,
        entry: NewEntry,
    ) -> EngineResult<RevenueTransaction> {
        self.append(client, TransactionKind::Subscription, entry)
    }

    pub fn add_renewal_entry(
        &self,
        client: &Subscriber,
        entry: NewEntry,
    ) -> EngineResult<RevenueTransaction> {
        self.append(client, TransactionKind::Renewal, entry)
    }

    pub fn add_other_entry(
        &self,
        client: &Subscriber,
        entry: NewEntry,
    ) -> EngineResult<RevenueTransaction> {
        self.append(client, TransactionKind::Other, entry)
    }

    fn append(
        &self,
        client: &Subscriber,
        kind: TransactionKind,
        entry: NewEntry,
    ) -> EngineResult<RevenueTransaction> {
        let txn = RevenueTransaction {
            id: EntityId::new(),
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            amount: entry.amount,
            kind,
            date: entry.date,
            status: if entry.pending {
                TransactionStatus::Pending
            } else {
                TransactionStatus::Committed
            },
            revert_reason: None,
            cost_snapshot: entry.cost_snapshot,
            server_snapshot: entry.server_snapshot,
            recorded_at: self.clock.now(),
        };
        let stored = self.gateway.add_transaction(txn)?;
        log::debug!(
            "ledger: {} {} {:.2} for {} on {}",
            stored.status,
            stored.kind,
            stored.amount,
            stored.client_name,
            stored.date
        );
        Ok(stored)
    }

    /// pending → committed.
    pub fn commit(&self, transaction_id: &str) -> EngineResult<RevenueTransaction> {
        let mut txn = self.find(transaction_id)?;
        if txn.status != TransactionStatus::Pending {
            return Err(EngineError::InvalidTransition {
                id: txn.id,
                from: txn.status.as_str(),
                to: TransactionStatus::Committed.as_str(),
            });
        }
        txn.status = TransactionStatus::Committed;
        self.gateway.update_transaction(&txn)?;
        Ok(txn)
    }

    /// committed → reverted. Reverting twice is a no-op.
    pub fn revert(&self, transaction_id: &str, reason: &str) -> EngineResult<RevenueTransaction> {
        let txn = self.find(transaction_id)?;
        self.revert_record(txn, reason)
    }

    fn revert_record(
        &self,
        mut txn: RevenueTransaction,
        reason: &str,
    ) -> EngineResult<RevenueTransaction> {
        match txn.status {
            TransactionStatus::Reverted => Ok(txn),
            TransactionStatus::Pending => Err(EngineError::InvalidTransition {
                id: txn.id,
                from: TransactionStatus::Pending.as_str(),
                to: TransactionStatus::Reverted.as_str(),
            }),
            TransactionStatus::Committed => {
                txn.status = TransactionStatus::Reverted;
                txn.revert_reason = Some(reason.to_string());
                self.gateway.update_transaction(&txn)?;
                log::info!("ledger: reverted {} ({reason})", txn.id);
                Ok(txn)
            }
        }
    }

    fn find(&self, transaction_id: &str) -> EngineResult<RevenueTransaction> {
        self.gateway
            .list_transactions()?
            .into_iter()
            .find(|t| t.id == transaction_id)
            .ok_or_else(|| EngineError::NotFound {
                kind: RecordKind::Transaction,
                id: transaction_id.to_string(),
            })
    }

    /// Align every subscriber's committed subscription entry with its
    /// activation date, leaving at most one such entry per subscriber.
    ///
    /// For each committed subscription entry:
    ///   - already on the activation date and first of its kind → kept
    ///   - off-date, and the subscriber has no entry on activation yet
    ///     → a copy is appended on the activation date, the original reverted
    ///   - anything else → reverted
    ///
    /// Subscribers that no longer exist, or whose activation date cannot be
    /// read, are left alone. Running this twice changes nothing the second time.
    pub fn normalize_subscription_dates(
        &self,
        clients: &[Subscriber],
    ) -> EngineResult<NormalizationReport> {
        let activations: HashMap<&str, NaiveDate> = clients
            .iter()
            .filter_map(|c| dates::parse_date(&c.activation_date).map(|d| (c.id.as_str(), d)))
            .collect();

        let candidates: Vec<RevenueTransaction> = self
            .gateway
            .list_transactions()?
            .into_iter()
            .filter(|t| t.kind == TransactionKind::Subscription && t.is_committed())
            .collect();

        // Subscriber id → id of the entry that stays on the activation date.
        let mut anchored: HashMap<String, String> = HashMap::new();
        for t in &candidates {
            if activations.get(t.client_id.as_str()) == Some(&t.date) {
                anchored
                    .entry(t.client_id.clone())
                    .or_insert_with(|| t.id.clone());
            }
        }

        let mut report = NormalizationReport::default();
        for t in candidates {
            let Some(&activation) = activations.get(t.client_id.as_str()) else {
                continue;
            };
            if anchored.get(&t.client_id) == Some(&t.id) {
                continue;
            }

            if t.date != activation && !anchored.contains_key(&t.client_id) {
                let corrected = RevenueTransaction {
                    id: EntityId::new(),
                    date: activation,
                    status: TransactionStatus::Committed,
                    revert_reason: None,
                    recorded_at: self.clock.now(),
                    ..t.clone()
                };
                let stored = self.gateway.add_transaction(corrected)?;
                anchored.insert(t.client_id.clone(), stored.id);
                self.revert_record(t, NORMALIZATION_REASON)?;
                report.corrected += 1;
            } else {
                self.revert_record(t, NORMALIZATION_REASON)?;
                report.reverted += 1;
            }
        }

        if report.changed() {
            self.gateway.add_system_log(SystemLogEntry::new(
                SystemLogKind::LedgerNormalization,
                None,
                "ledger",
                format!(
                    "Subscription dates normalized: {} corrected, {} reverted",
                    report.corrected, report.reverted
                ),
                self.clock.now(),
            ))?;
            log::info!(
                "ledger: normalization corrected {} and reverted {} entries",
                report.corrected,
                report.reverted
            );
        }
        Ok(report)
    }
}

// ── Read side ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "period", rename_all = "snake_case")]
pub enum Period {
    All,
    CurrentMonth,
    Month { year: i32, month: u32 },
    /// Inclusive on both ends.
    Range { from: NaiveDate, to: NaiveDate },
}

impl Period {
    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match *self {
            Self::All => true,
            Self::CurrentMonth => same_month(date, today),
            Self::Month { year, month } => date.year() == year && date.month() == month,
            Self::Range { from, to } => from <= date && date <= to,
        }
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LedgerMetrics {
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net: f64,
    pub monthly_revenue: f64,
    pub average_ticket: f64,
    pub pending_revenue: f64,
    pub committed_count: usize,
    pub reverted_count: usize,
}

fn matches_filter(t: &RevenueTransaction, type_filter: Option<TransactionKind>) -> bool {
    type_filter.map_or(true, |k| t.kind == k)
}

/// Aggregate the ledger. Only committed entries count toward money totals.
pub fn metrics(
    transactions: &[RevenueTransaction],
    client_count: usize,
    period: Period,
    type_filter: Option<TransactionKind>,
    today: NaiveDate,
) -> LedgerMetrics {
    let mut m = LedgerMetrics::default();
    for t in transactions.iter().filter(|t| matches_filter(t, type_filter)) {
        match t.status {
            TransactionStatus::Committed => {
                if same_month(t.date, today) {
                    m.monthly_revenue += t.amount;
                }
                if period.contains(t.date, today) {
                    m.total_revenue += t.amount;
                    m.total_expenses += t.cost_snapshot.unwrap_or(0.0);
                    m.committed_count += 1;
                }
            }
            TransactionStatus::Pending if period.contains(t.date, today) => {
                m.pending_revenue += t.amount;
            }
            TransactionStatus::Reverted if period.contains(t.date, today) => {
                m.reverted_count += 1;
            }
            _ => {}
        }
    }
    m.net = m.total_revenue - m.total_expenses;
    m.average_ticket = if client_count > 0 {
        m.total_revenue / client_count as f64
    } else {
        0.0
    };
    m
}

/// Entries for a period/type filtered view.
///
/// Renewal entries only show while their subscriber is inside the expiring
/// window (0..=window days left). Once the subscriber is comfortably current,
/// overdue, or gone, its renewal entries drop out of the view. Reverted
/// entries stay visible for audit.
pub fn visible_entries<'t>(
    transactions: &'t [RevenueTransaction],
    clients: &[Subscriber],
    period: Period,
    type_filter: Option<TransactionKind>,
    today: NaiveDate,
    expiring_window: DayCount,
) -> Vec<&'t RevenueTransaction> {
    let days_left: HashMap<&str, expiration::Classification> = clients
        .iter()
        .map(|c| {
            (
                c.id.as_str(),
                expiration::classify_with_window(&c.expiration_date, today, expiring_window),
            )
        })
        .collect();

    transactions
        .iter()
        .filter(|t| matches_filter(t, type_filter) && period.contains(t.date, today))
        .filter(|t| {
            t.kind != TransactionKind::Renewal
                || days_left
                    .get(t.client_id.as_str())
                    .is_some_and(|c| c.is_within(expiring_window))
        })
        .collect()
}
