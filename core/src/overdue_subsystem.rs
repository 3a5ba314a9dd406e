//! Overdue subsystem: enforces "overdue means payment pending".
//!
//! For every active subscriber whose expiration has passed:
//!   - payment status is forced to Pending (lifecycle stays Active);
//!     already-pending subscribers are left alone
//!   - once the overdue magnitude leaves the tolerance window, one
//!     `overdue_tolerance_breach` log entry is written and an escalation
//!     event fires, once per overdue episode
//!
//! Execution order: after trial expiry, before migration.

use crate::{
    error::EngineResult,
    event::EngineEvent,
    expiration,
    gateway::RecordKind,
    model::{PaymentStatus, SystemLogEntry, SystemLogKind},
    subsystem::{PassContext, PassStep},
};

#[derive(Debug, Default)]
pub struct OverdueSubsystem;

impl OverdueSubsystem {
    pub fn new() -> Self {
        Self
    }

    fn escalate(
        &self,
        ctx: &mut PassContext<'_>,
        i: usize,
        days_overdue: i64,
    ) -> EngineResult<Option<EngineEvent>> {
        let client = &ctx.snapshot.clients[i];
        if ctx.dedup.is_escalated(&client.id) {
            return Ok(None);
        }
        ctx.gateway.add_system_log(SystemLogEntry::new(
            SystemLogKind::OverdueToleranceBreach,
            Some(&client.id),
            &client.name,
            format!(
                "Overdue for {days_overdue} days, past the {}-day tolerance",
                ctx.config.thresholds.overdue_tolerance_days
            ),
            ctx.now,
        ))?;
        let event = EngineEvent::OverdueEscalated {
            client_id: client.id.clone(),
            name: client.name.clone(),
            days_overdue,
        };
        let id = client.id.clone();
        ctx.dedup.note_escalation(&id);
        ctx.report.tolerance_breaches += 1;
        Ok(Some(event))
    }
}

impl PassStep for OverdueSubsystem {
    fn name(&self) -> &'static str {
        "overdue"
    }

    fn run(&mut self, ctx: &mut PassContext<'_>) -> EngineResult<Vec<EngineEvent>> {
        let mut out_events = Vec::new();
        let thresholds = ctx.config.thresholds.clone();

        for i in 0..ctx.snapshot.clients.len() {
            let client = &ctx.snapshot.clients[i];
            if !client.is_active() {
                continue;
            }
            let class = expiration::classify_with_window(
                &client.expiration_date,
                ctx.today,
                thresholds.expiring_window_days,
            );
            if !class.is_overdue() {
                continue;
            }

            if client.payment_status != PaymentStatus::Pending {
                let mut updated = client.clone();
                updated.payment_status = PaymentStatus::Pending;
                if let Err(e) = ctx.gateway.update_client(&updated) {
                    let id = updated.id.clone();
                    ctx.isolate(self.name(), RecordKind::Client, &id, e);
                    continue;
                }
                log::info!(
                    "overdue: {} is {} days overdue, payment set to pending",
                    updated.name,
                    class.days_overdue()
                );
                ctx.snapshot.clients[i] = updated;
                ctx.report.clients_set_pending += 1;
            }

            if class.days_overdue() > thresholds.overdue_tolerance_days {
                match self.escalate(ctx, i, class.days_overdue()) {
                    Ok(Some(event)) => out_events.push(event),
                    Ok(None) => {}
                    Err(e) => {
                        let id = ctx.snapshot.clients[i].id.clone();
                        ctx.isolate(self.name(), RecordKind::Client, &id, e);
                    }
                }
            }
        }

        log::debug!(
            "overdue: {} set pending, {} escalated",
            ctx.report.clients_set_pending,
            ctx.report.tolerance_breaches
        );
        Ok(out_events)
    }
}
