//! Expiration classification.
//!
//! `days` is the number of calendar days from today to the expiration date:
//!   days < 0        → Overdue
//!   0 ≤ days ≤ 7    → Expiring   (window is configurable)
//!   otherwise       → Normal
//!
//! An unreadable expiration is Normal with no day count. Classification
//! fails open so one bad record never blocks anything downstream.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{dates, types::DayCount};

pub const DEFAULT_EXPIRING_WINDOW_DAYS: DayCount = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationStatus {
    Overdue,
    Expiring,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub status: ExpirationStatus,
    /// `None` when the expiration could not be read (treated as never expiring).
    pub days: Option<DayCount>,
}

impl Classification {
    pub fn is_overdue(&self) -> bool {
        self.status == ExpirationStatus::Overdue
    }

    /// How many days past expiration, zero when not overdue.
    pub fn days_overdue(&self) -> DayCount {
        match self.days {
            Some(d) if d < 0 => -d,
            _ => 0,
        }
    }

    /// True when the day count falls in `0..=window`.
    pub fn is_within(&self, window: DayCount) -> bool {
        matches!(self.days, Some(d) if (0..=window).contains(&d))
    }
}

/// Classify with the default seven-day expiring window.
pub fn classify(expiration: &str, today: NaiveDate) -> Classification {
    classify_with_window(expiration, today, DEFAULT_EXPIRING_WINDOW_DAYS)
}

pub fn classify_with_window(
    expiration: &str,
    today: NaiveDate,
    expiring_window: DayCount,
) -> Classification {
    match dates::parse_date(expiration) {
        Some(date) => classify_date(date, today, expiring_window),
        None => Classification {
            status: ExpirationStatus::Normal,
            days: None,
        },
    }
}

pub fn classify_date(
    expiration: NaiveDate,
    today: NaiveDate,
    expiring_window: DayCount,
) -> Classification {
    let days = dates::days_between(today, expiration);
    let status = if days < 0 {
        ExpirationStatus::Overdue
    } else if days <= expiring_window {
        ExpirationStatus::Expiring
    } else {
        ExpirationStatus::Normal
    };
    Classification {
        status,
        days: Some(days),
    }
}

/// True only when overdue and the overdue magnitude is within `tolerance_days`.
/// Used to hold back escalation during the grace window.
pub fn is_within_overdue_tolerance(
    expiration: &str,
    tolerance_days: DayCount,
    today: NaiveDate,
) -> bool {
    let c = classify(expiration, today);
    c.is_overdue() && c.days_overdue() <= tolerance_days
}
