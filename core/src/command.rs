use serde::{Deserialize, Serialize};

use crate::{
    config::PlanConfig,
    engine::ReconEngine,
    error::EngineResult,
    event::{EngineEvent, EngineSignal},
    ledger::NormalizationReport,
    model::{Lead, RevenueTransaction, Subscriber, Trial},
    operations::RenewalReceipt,
    subsystem::PassReport,
    types::EntityId,
};

/// Every operation a host can request.
/// Variants are only ever appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum UserCommand {
    // ── Subscribers ───────────────────────────────
    RenewClient {
        client_id: EntityId,
        #[serde(default)]
        explicit_date: Option<String>,
    },
    MarkClientPaid {
        client_id: EntityId,
    },
    AddClient {
        client: Subscriber,
    },
    DeleteClient {
        client_id: EntityId,
    },

    // ── Ledger ────────────────────────────────────
    CommitTransaction {
        transaction_id: EntityId,
    },
    RevertTransaction {
        transaction_id: EntityId,
        reason: String,
    },
    NormalizeLedger,

    // ── Pipeline ──────────────────────────────────
    AddTrial {
        trial: Trial,
    },
    AddLead {
        name:  String,
        #[serde(default)]
        phone: String,
    },

    // ── Engine ────────────────────────────────────
    RunPass,
    SettingsChanged {
        plans: Vec<PlanConfig>,
    },
    ClientsUpdated,
}

/// What a command produced, tagged for the IPC reply.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Renewed { receipt: RenewalReceipt },
    Client { client: Subscriber },
    Deleted { id: EntityId },
    Transaction { transaction: RevenueTransaction },
    Normalized { report: NormalizationReport },
    Trial { trial: Trial },
    Lead { lead: Lead },
    Pass { report: PassReport },
    Signal { events: Vec<EngineEvent> },
}

impl UserCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RenewClient { .. }       => "renew_client",
            Self::MarkClientPaid { .. }    => "mark_client_paid",
            Self::AddClient { .. }         => "add_client",
            Self::DeleteClient { .. }      => "delete_client",
            Self::CommitTransaction { .. } => "commit_transaction",
            Self::RevertTransaction { .. } => "revert_transaction",
            Self::NormalizeLedger          => "normalize_ledger",
            Self::AddTrial { .. }          => "add_trial",
            Self::AddLead { .. }           => "add_lead",
            Self::RunPass                  => "run_pass",
            Self::SettingsChanged { .. }   => "settings_changed",
            Self::ClientsUpdated           => "clients_updated",
        }
    }

    /// Run the command against an engine. Errors propagate unchanged.
    pub fn apply(self, engine: &mut ReconEngine) -> EngineResult<CommandOutcome> {
        log::debug!("command: {}", self.name());
        Ok(match self {
            Self::RenewClient { client_id, explicit_date } => CommandOutcome::Renewed {
                receipt: engine.renew_client(&client_id, explicit_date.as_deref())?,
            },
            Self::MarkClientPaid { client_id } => CommandOutcome::Client {
                client: engine.mark_client_as_paid(&client_id)?,
            },
            Self::AddClient { client } => CommandOutcome::Client {
                client: engine.add_client(client)?,
            },
            Self::DeleteClient { client_id } => {
                engine.delete_client(&client_id)?;
                CommandOutcome::Deleted { id: client_id }
            }
            Self::CommitTransaction { transaction_id } => CommandOutcome::Transaction {
                transaction: engine.commit_transaction(&transaction_id)?,
            },
            Self::RevertTransaction { transaction_id, reason } => CommandOutcome::Transaction {
                transaction: engine.revert_transaction(&transaction_id, &reason)?,
            },
            Self::NormalizeLedger => CommandOutcome::Normalized {
                report: engine.normalize_subscription_dates()?,
            },
            Self::AddTrial { trial } => CommandOutcome::Trial {
                trial: engine.add_trial(trial)?,
            },
            Self::AddLead { name, phone } => {
                let lead = Lead::manual(&name, &phone, engine.clock.now());
                CommandOutcome::Lead {
                    lead: engine.add_lead(lead)?,
                }
            }
            Self::RunPass => CommandOutcome::Pass {
                report: engine.run_pass()?,
            },
            Self::SettingsChanged { plans } => CommandOutcome::Signal {
                events: engine.handle_signal(EngineSignal::SettingsChanged { plans })?,
            },
            Self::ClientsUpdated => CommandOutcome::Signal {
                events: engine.handle_signal(EngineSignal::ClientsUpdated)?,
            },
        })
    }
}
