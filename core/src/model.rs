//! Persisted records: subscribers, ledger entries, leads, trials, and the
//! system log. The gateway owns them; the engine only projects them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Stable text form for enum columns.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ── Subscriber ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
}
text_enum!(PaymentStatus { Pending => "pending", Paid => "paid" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Inactive,
}
text_enum!(LifecycleStatus { Active => "active", Inactive => "inactive" });

/// A customer on a recurring plan.
///
/// Dates are kept as the strings the user entered; everything that reasons
/// about them goes through `dates::parse_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Subscriber {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub plan: String,
    pub price: f64,
    pub activation_date: String,
    pub expiration_date: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub status: LifecycleStatus,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub app: Option<String>,
}

impl Subscriber {
    pub fn is_active(&self) -> bool {
        self.status == LifecycleStatus::Active
    }
}

// ── Revenue ledger ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Subscription,
    Renewal,
    Other,
}
text_enum!(TransactionKind {
    Subscription => "subscription",
    Renewal => "renewal",
    Other => "other",
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    Reverted,
}
text_enum!(TransactionStatus {
    Pending => "pending",
    Committed => "committed",
    Reverted => "reverted",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueTransaction {
    pub id: EntityId,
    pub client_id: EntityId,
    pub client_name: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub date: NaiveDate,
    pub status: TransactionStatus,
    pub revert_reason: Option<String>,
    /// Server cost at the time of the entry; feeds expense totals.
    pub cost_snapshot: Option<f64>,
    pub server_snapshot: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl RevenueTransaction {
    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }
}

// ── Pipeline ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadCategory {
    New,
    #[serde(rename = "ex-client")]
    ExClient,
}
text_enum!(LeadCategory { New => "new", ExClient => "ex-client" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadSource {
    Manual,
    Auto,
}
text_enum!(LeadSource { Manual => "manual", Auto => "auto" });

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStage {
    #[default]
    New,
    Contacted,
    Won,
    Lost,
}
text_enum!(LeadStage {
    New => "new",
    Contacted => "contacted",
    Won => "won",
    Lost => "lost",
});

/// A snapshot of the subscriber a lead was migrated from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanSnapshot {
    pub plan: String,
    pub price: f64,
    pub expiration_date: String,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub phone: String,
    pub category: LeadCategory,
    pub source: LeadSource,
    #[serde(default)]
    pub stage: LeadStage,
    #[serde(default)]
    pub from_migration: bool,
    /// Set only for leads migrated from a subscriber.
    #[serde(default)]
    pub origin_client_id: Option<EntityId>,
    #[serde(default)]
    pub snapshot: Option<PlanSnapshot>,
    #[serde(default)]
    pub migration_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// A lead entered by hand, outside any migration.
    pub fn manual(name: &str, phone: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.to_string(),
            phone: phone.to_string(),
            category: LeadCategory::New,
            source: LeadSource::Manual,
            stage: LeadStage::New,
            from_migration: false,
            origin_client_id: None,
            snapshot: None,
            migration_reason: None,
            created_at,
        }
    }

    pub fn is_migrated_from(&self, client_id: &str) -> bool {
        self.from_migration && self.origin_client_id.as_deref() == Some(client_id)
    }
}

// ── Trials ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    #[default]
    Active,
    Expired,
    Converted,
}
text_enum!(TrialStatus {
    Active => "active",
    Expired => "expired",
    Converted => "converted",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trial {
    #[serde(default)]
    pub id: EntityId,
    pub client_name: String,
    #[serde(default)]
    pub phone: String,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub status: TrialStatus,
}

impl Trial {
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.ends_at <= now
    }
}

// ── System log ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SystemLogKind {
    ClientMigration,
    TrialMigration,
    OverdueToleranceBreach,
    ClientRenewal,
    LedgerNormalization,
}
text_enum!(SystemLogKind {
    ClientMigration => "client_migration",
    TrialMigration => "trial_migration",
    OverdueToleranceBreach => "overdue_tolerance_breach",
    ClientRenewal => "client_renewal",
    LedgerNormalization => "ledger_normalization",
});

/// Append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemLogEntry {
    pub id: EntityId,
    pub kind: SystemLogKind,
    pub entity_id: Option<EntityId>,
    pub entity_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl SystemLogEntry {
    pub fn new(
        kind: SystemLogKind,
        entity_id: Option<&str>,
        entity_name: &str,
        message: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            entity_id: entity_id.map(str::to_string),
            entity_name: entity_name.to_string(),
            message,
            created_at,
        }
    }
}

/// Digits only. Used to match trials against existing leads by phone.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Trimmed and lowercased. Used to match trials against leads by name.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
