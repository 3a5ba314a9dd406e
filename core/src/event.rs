//! Typed messages between the engine and its UI host.
//!
//! RULE: the engine never calls into the UI. It publishes `EngineEvent`s
//! to an `EventBus`, and the host pushes `EngineSignal`s back in.

use crate::{config::PlanConfig, types::{DayCount, EntityId}};
use serde::{Deserialize, Serialize};

/// Every notification the engine can emit.
/// Variants are only ever appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    // ── Subscriber alerts ──────────────────────────
    OverdueAlert {
        client_id: EntityId,
        name: String,
        expiration_date: String,
    },
    ExpiringAlert {
        client_id: EntityId,
        name: String,
        days_remaining: DayCount,
    },
    /// Overdue past the tolerance window. Once per overdue episode.
    OverdueEscalated {
        client_id: EntityId,
        name: String,
        days_overdue: DayCount,
    },

    // ── Trial alerts ───────────────────────────────
    TrialExpiredAlert {
        trial_id: EntityId,
        name: String,
    },

    // ── Pipeline ───────────────────────────────────
    MigrationAlert {
        kind: MigrationKind,
        entity_name: String,
    },

    // ── View refresh ───────────────────────────────
    ClientsUpdated {
        changed: usize,
    },
}

impl EngineEvent {
    /// Stable name, used for log lines and IPC filtering.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::OverdueAlert { .. }      => "overdue_alert",
            Self::ExpiringAlert { .. }     => "expiring_alert",
            Self::OverdueEscalated { .. }  => "overdue_escalated",
            Self::TrialExpiredAlert { .. } => "trial_expired_alert",
            Self::MigrationAlert { .. }    => "migration_alert",
            Self::ClientsUpdated { .. }    => "clients_updated",
        }
    }

    /// Duplicate-migration notices are informational only.
    pub fn priority(&self) -> AlertPriority {
        match self {
            Self::MigrationAlert { kind: MigrationKind::Duplicate, .. } => AlertPriority::Low,
            Self::ClientsUpdated { .. } => AlertPriority::Low,
            Self::OverdueEscalated { .. } => AlertPriority::High,
            _ => AlertPriority::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MigrationKind {
    Migrated,
    Duplicate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AlertPriority {
    Low,
    Normal,
    High,
}

/// Signals the host sends into the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum EngineSignal {
    /// The plan catalog was edited; cadence lookups must be rebuilt.
    SettingsChanged { plans: Vec<PlanConfig> },
    /// Subscribers changed outside the engine; re-run the alert scan.
    ClientsUpdated,
}
