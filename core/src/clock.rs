//! Engine clock: owns the notion of "now" and "today".
//!
//! Production engines follow the system clock. Tests pin the clock to a
//! fixed instant and advance it by hand, the same way a tick loop would.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EngineClock {
    System,
    Fixed { now: DateTime<Utc> },
}

impl EngineClock {
    /// A clock pinned to midday UTC on `date`.
    pub fn fixed_on(date: NaiveDate) -> Self {
        let now = date
            .and_hms_opt(12, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or_else(Utc::now);
        Self::Fixed { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed { now } => *now,
        }
    }

    /// Calendar date of `now()`. All expiration math runs on this.
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Move a fixed clock forward. No effect on the system clock.
    pub fn advance(&mut self, by: Duration) {
        if let Self::Fixed { now } = self {
            *now += by;
        }
    }

    pub fn advance_days(&mut self, days: i64) {
        self.advance(Duration::days(days));
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }
}

impl Default for EngineClock {
    fn default() -> Self {
        Self::System
    }
}
