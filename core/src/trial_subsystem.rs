//! Trial expiry subsystem: keeps each trial's status in line with its end time.
//!
//!   active,  end time passed   → expired
//!   expired, end time in future → active   (trial was extended / re-tested)
//!
//! Converted trials are never touched.
//!
//! Execution order: first step of every pass.

use crate::{
    error::EngineResult,
    event::EngineEvent,
    gateway::RecordKind,
    model::TrialStatus,
    subsystem::{PassContext, PassStep},
};

#[derive(Debug, Default)]
pub struct TrialExpirySubsystem;

impl TrialExpirySubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl PassStep for TrialExpirySubsystem {
    fn name(&self) -> &'static str {
        "trial_expiry"
    }

    fn run(&mut self, ctx: &mut PassContext<'_>) -> EngineResult<Vec<EngineEvent>> {
        let now = ctx.now;
        for i in 0..ctx.snapshot.trials.len() {
            let trial = &ctx.snapshot.trials[i];
            let next_status = match trial.status {
                TrialStatus::Active if trial.has_ended(now) => TrialStatus::Expired,
                TrialStatus::Expired if !trial.has_ended(now) => TrialStatus::Active,
                _ => continue,
            };

            let mut updated = trial.clone();
            updated.status = next_status;
            match ctx.gateway.update_trial(&updated) {
                Ok(()) => {
                    if next_status == TrialStatus::Expired {
                        ctx.report.trials_expired += 1;
                    } else {
                        ctx.report.trials_reopened += 1;
                    }
                    ctx.snapshot.trials[i] = updated;
                }
                Err(e) => {
                    let id = updated.id.clone();
                    ctx.isolate(self.name(), RecordKind::Trial, &id, e);
                }
            }
        }

        log::debug!(
            "trial_expiry: {} expired, {} reopened",
            ctx.report.trials_expired,
            ctx.report.trials_reopened
        );
        Ok(Vec::new())
    }
}
