//! Alert subsystem: turns classifications into user-facing notifications.
//!
//! Runs last, on the state the earlier steps left behind. Every alert goes
//! through `AlertDedup`, so an unchanged condition is announced once:
//!
//!   overdue              → one alert per overdue episode
//!   expiring (0..=7)     → one alert per distinct day count
//!   trial end passed     → one alert per trial
//!
//! Leaving a condition clears its entry, so a later episode alerts again.
//! The same scan runs outside a pass when the host signals that
//! subscribers changed.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
    dedup::AlertDedup,
    error::EngineResult,
    event::EngineEvent,
    expiration::{self, ExpirationStatus},
    model::{Subscriber, Trial, TrialStatus},
    subsystem::{PassContext, PassStep},
    types::DayCount,
};

/// Alerts due for one subscriber. Updates `dedup` as a side effect.
pub fn client_alerts(
    dedup: &mut AlertDedup,
    client: &Subscriber,
    today: NaiveDate,
    window: DayCount,
) -> Vec<EngineEvent> {
    let mut out = Vec::new();
    if !client.is_active() {
        dedup.clear_overdue(&client.id);
        dedup.clear_expiring(&client.id);
        return out;
    }

    let class = expiration::classify_with_window(&client.expiration_date, today, window);
    match class.status {
        ExpirationStatus::Overdue => {
            dedup.clear_expiring(&client.id);
            if dedup.note_overdue(&client.id) {
                out.push(EngineEvent::OverdueAlert {
                    client_id: client.id.clone(),
                    name: client.name.clone(),
                    expiration_date: client.expiration_date.clone(),
                });
            }
        }
        ExpirationStatus::Expiring => {
            dedup.clear_overdue(&client.id);
            let days = class.days.unwrap_or_default();
            if dedup.note_expiring(&client.id, days) {
                out.push(EngineEvent::ExpiringAlert {
                    client_id: client.id.clone(),
                    name: client.name.clone(),
                    days_remaining: days,
                });
            }
        }
        ExpirationStatus::Normal => {
            dedup.clear_overdue(&client.id);
            dedup.clear_expiring(&client.id);
        }
    }
    out
}

/// Alert due for one trial, if any. Converted trials never alert.
pub fn trial_alert(
    dedup: &mut AlertDedup,
    trial: &Trial,
    now: DateTime<Utc>,
) -> Option<EngineEvent> {
    if trial.status == TrialStatus::Converted || !trial.has_ended(now) {
        dedup.clear_trial_expired(&trial.id);
        return None;
    }
    dedup
        .note_trial_expired(&trial.id)
        .then(|| EngineEvent::TrialExpiredAlert {
            trial_id: trial.id.clone(),
            name: trial.client_name.clone(),
        })
}

/// Full scan over a set of subscribers and trials.
pub fn scan(
    dedup: &mut AlertDedup,
    clients: &[Subscriber],
    trials: &[Trial],
    now: DateTime<Utc>,
    window: DayCount,
) -> Vec<EngineEvent> {
    let today = now.date_naive();
    let mut out: Vec<EngineEvent> = clients
        .iter()
        .flat_map(|c| client_alerts(dedup, c, today, window))
        .collect();
    out.extend(trials.iter().filter_map(|t| trial_alert(dedup, t, now)));
    out
}

#[derive(Debug, Default)]
pub struct AlertSubsystem;

impl AlertSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl PassStep for AlertSubsystem {
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn run(&mut self, ctx: &mut PassContext<'_>) -> EngineResult<Vec<EngineEvent>> {
        let events = scan(
            ctx.dedup,
            &ctx.snapshot.clients,
            &ctx.snapshot.trials,
            ctx.now,
            ctx.config.thresholds.expiring_window_days,
        );
        log::debug!("alerts: {} raised", events.len());
        Ok(events)
    }
}
