//! Migration subsystem: promotes lapsed subscribers and idle trials into
//! the sales pipeline, exactly once each.
//!
//! Subscribers: active, overdue for at least `client_migration_days`, and
//! no migrated lead already pointing back at the subscriber id
//!   → lead (category ex-client, source auto) with a plan snapshot,
//!     a `client_migration` log entry, and a "migrated" notice.
//!
//! Trials: past their end time by at least `trial_migration_days`, not
//! converted, and no lead with the same normalized phone or name
//!   → lead (category new, source auto, no back-reference),
//!     a `trial_migration` log entry, and a "migrated" notice.
//!
//! A candidate that already has a matching lead is not an error: it gets a
//! low-priority "duplicate" notice, once per engine instance.
//!
//! Once the lead is stored the migration is done. A log write that fails
//! after that is recorded as a pass failure and the notice still fires.
//!
//! Execution order: after overdue, so payment snapshots read "pending".

use chrono::Duration;

use crate::{
    error::EngineResult,
    event::{EngineEvent, MigrationKind},
    expiration,
    gateway::RecordKind,
    model::{
        normalize_name, normalize_phone, Lead, LeadCategory, LeadSource, LeadStage, PlanSnapshot,
        Subscriber, SystemLogEntry, SystemLogKind, Trial, TrialStatus,
    },
    subsystem::{PassContext, PassStep},
    types::EntityId,
};

/// Result of checking one migration candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    Migrated(Lead),
    /// A matching lead already exists; nothing was written.
    Duplicate,
    NotEligible,
}

#[derive(Debug, Default)]
pub struct MigrationSubsystem;

impl MigrationSubsystem {
    pub fn new() -> Self {
        Self
    }

    /// Migrate one subscriber if it qualifies.
    pub fn migrate_client(
        &self,
        ctx: &mut PassContext<'_>,
        client: &Subscriber,
    ) -> EngineResult<MigrationOutcome> {
        if !client.is_active() {
            return Ok(MigrationOutcome::NotEligible);
        }
        let class = expiration::classify(&client.expiration_date, ctx.today);
        let days_overdue = class.days_overdue();
        if !class.is_overdue() || days_overdue < ctx.config.thresholds.client_migration_days {
            return Ok(MigrationOutcome::NotEligible);
        }
        if ctx.snapshot.leads.iter().any(|l| l.is_migrated_from(&client.id)) {
            return Ok(MigrationOutcome::Duplicate);
        }

        let reason = format!("Subscription overdue for {days_overdue} days");
        let lead = Lead {
            id: EntityId::new(),
            name: client.name.clone(),
            phone: client.phone.clone(),
            category: LeadCategory::ExClient,
            source: LeadSource::Auto,
            stage: LeadStage::New,
            from_migration: true,
            origin_client_id: Some(client.id.clone()),
            snapshot: Some(PlanSnapshot {
                plan: client.plan.clone(),
                price: client.price,
                expiration_date: client.expiration_date.clone(),
                payment_status: client.payment_status,
            }),
            migration_reason: Some(reason.clone()),
            created_at: ctx.now,
        };
        let stored = ctx.gateway.add_lead(lead)?;
        ctx.snapshot.leads.push(stored.clone());

        let entry = SystemLogEntry::new(
            SystemLogKind::ClientMigration,
            Some(&client.id),
            &client.name,
            format!("Migrated to pipeline as ex-client: {reason}"),
            ctx.now,
        );
        self.write_log(ctx, RecordKind::Client, &client.id, entry);
        log::info!("migration: {} moved to pipeline ({reason})", client.name);
        Ok(MigrationOutcome::Migrated(stored))
    }

    /// Migrate one trial if it qualifies.
    pub fn migrate_trial(
        &self,
        ctx: &mut PassContext<'_>,
        trial: &Trial,
    ) -> EngineResult<MigrationOutcome> {
        if trial.status == TrialStatus::Converted {
            return Ok(MigrationOutcome::NotEligible);
        }
        let cutoff = trial.ends_at + Duration::days(ctx.config.thresholds.trial_migration_days);
        if ctx.now < cutoff {
            return Ok(MigrationOutcome::NotEligible);
        }
        if has_matching_lead(&ctx.snapshot.leads, trial) {
            return Ok(MigrationOutcome::Duplicate);
        }

        let days_idle = (ctx.now - trial.ends_at).num_days();
        let reason = format!("Trial ended {days_idle} days ago without conversion");
        let lead = Lead {
            id: EntityId::new(),
            name: trial.client_name.clone(),
            phone: trial.phone.clone(),
            category: LeadCategory::New,
            source: LeadSource::Auto,
            stage: LeadStage::New,
            from_migration: true,
            origin_client_id: None,
            snapshot: None,
            migration_reason: Some(reason.clone()),
            created_at: ctx.now,
        };
        let stored = ctx.gateway.add_lead(lead)?;
        ctx.snapshot.leads.push(stored.clone());

        let entry = SystemLogEntry::new(
            SystemLogKind::TrialMigration,
            Some(&trial.id),
            &trial.client_name,
            format!("Migrated to pipeline as new lead: {reason}"),
            ctx.now,
        );
        self.write_log(ctx, RecordKind::Trial, &trial.id, entry);
        log::info!("migration: trial {} moved to pipeline ({reason})", trial.client_name);
        Ok(MigrationOutcome::Migrated(stored))
    }

    /// The lead is already stored, so the migration stands either way. A
    /// failed log write is reported with the pass failures.
    fn write_log(
        &self,
        ctx: &mut PassContext<'_>,
        kind: RecordKind,
        entity_id: &str,
        entry: SystemLogEntry,
    ) {
        if let Err(e) = ctx.gateway.add_system_log(entry) {
            ctx.isolate(self.name(), kind, entity_id, e);
        }
    }

    fn notice(
        &self,
        ctx: &mut PassContext<'_>,
        entity_id: &str,
        entity_name: &str,
        outcome: MigrationOutcome,
    ) -> Option<EngineEvent> {
        match outcome {
            MigrationOutcome::Migrated(_) => {
                ctx.report.leads_created += 1;
                Some(EngineEvent::MigrationAlert {
                    kind: MigrationKind::Migrated,
                    entity_name: entity_name.to_string(),
                })
            }
            MigrationOutcome::Duplicate => {
                if !ctx.dedup.note_duplicate_notice(entity_id) {
                    return None;
                }
                ctx.report.duplicates_skipped += 1;
                log::debug!("migration: {entity_name} not migrated, lead already exists");
                Some(EngineEvent::MigrationAlert {
                    kind: MigrationKind::Duplicate,
                    entity_name: entity_name.to_string(),
                })
            }
            MigrationOutcome::NotEligible => None,
        }
    }
}

/// Same digits-only phone, or same trimmed case-insensitive name.
/// Empty values never match.
pub fn has_matching_lead(leads: &[Lead], trial: &Trial) -> bool {
    let phone = normalize_phone(&trial.phone);
    let name = normalize_name(&trial.client_name);
    leads.iter().any(|l| {
        (!phone.is_empty() && normalize_phone(&l.phone) == phone)
            || (!name.is_empty() && normalize_name(&l.name) == name)
    })
}

impl PassStep for MigrationSubsystem {
    fn name(&self) -> &'static str {
        "migration"
    }

    fn run(&mut self, ctx: &mut PassContext<'_>) -> EngineResult<Vec<EngineEvent>> {
        let mut out_events = Vec::new();

        // One record at a time: each lead lands in the snapshot before the
        // next candidate is checked.
        let clients = ctx.snapshot.clients.clone();
        for client in &clients {
            match self.migrate_client(ctx, client) {
                Ok(outcome) => {
                    out_events.extend(self.notice(ctx, &client.id, &client.name, outcome));
                }
                Err(e) => ctx.isolate(self.name(), RecordKind::Client, &client.id, e),
            }
        }

        let trials = ctx.snapshot.trials.clone();
        for trial in &trials {
            match self.migrate_trial(ctx, trial) {
                Ok(outcome) => {
                    out_events.extend(self.notice(ctx, &trial.id, &trial.client_name, outcome));
                }
                Err(e) => ctx.isolate(self.name(), RecordKind::Trial, &trial.id, e),
            }
        }

        log::debug!(
            "migration: {} leads created, {} duplicates",
            ctx.report.leads_created,
            ctx.report.duplicates_skipped
        );
        Ok(out_events)
    }
}
