//! The reconciliation engine: owns the projections, the dedup context, the
//! event bus and the pass steps.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Trial expiry subsystem
//!   2. Overdue subsystem
//!   3. Migration subsystem
//!   4. Alert subsystem
//!
//! RULES:
//!   - Steps execute in registration order, every pass.
//!   - A pass reads subscribers, trials and leads once, up front. Failing to
//!     read any of them fails the whole pass.
//!   - Per-record failures are isolated and reported; the pass continues.
//!   - At most one pass runs at a time (see `PassGate`).
//!   - The engine never calls into the UI; it publishes to the `EventBus`.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::{
    alert_subsystem::{self, AlertSubsystem},
    bus::{EventBus, EventSink},
    clock::EngineClock,
    config::EngineConfig,
    dedup::AlertDedup,
    error::{EngineError, EngineResult},
    event::{EngineEvent, EngineSignal},
    expiration::{self, Classification},
    gateway::PersistenceGateway,
    ledger::{self, LedgerMetrics, NormalizationReport, Period, RevenueLedger},
    migration_subsystem::MigrationSubsystem,
    model::{Lead, RevenueTransaction, Subscriber, TransactionKind, Trial},
    overdue_subsystem::OverdueSubsystem,
    plans::PlanCatalog,
    scheduler::PassGate,
    store::Store,
    subsystem::{PassContext, PassReport, PassSnapshot, PassStep},
    trial_subsystem::TrialExpirySubsystem,
};

/// Read-only view of the collections, refreshed after every write.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub clients:      Vec<Subscriber>,
    pub leads:        Vec<Lead>,
    pub trials:       Vec<Trial>,
    pub transactions: Vec<RevenueTransaction>,
}

pub struct ReconEngine {
    pub clock:               EngineClock,
    pub(crate) gateway:      Box<dyn PersistenceGateway>,
    pub(crate) config:       EngineConfig,
    pub(crate) plans:        PlanCatalog,
    pub(crate) dedup:        AlertDedup,
    pub(crate) projection:   Projection,
    bus:                     EventBus,
    gate:                    PassGate,
    steps:                   Vec<Box<dyn PassStep>>,
    normalized:              bool,
    passes_run:              u64,
    last_report:             Option<PassReport>,
}

impl ReconEngine {
    pub fn new(
        gateway: Box<dyn PersistenceGateway>,
        config: EngineConfig,
        clock: EngineClock,
    ) -> Self {
        Self {
            plans:       PlanCatalog::new(&config.plans),
            clock,
            gateway,
            config,
            dedup:       AlertDedup::new(),
            projection:  Projection::default(),
            bus:         EventBus::new(),
            gate:        PassGate::new(),
            steps:       Vec::new(),
            normalized:  false,
            passes_run:  0,
            last_report: None,
        }
    }

    /// Build a fully wired engine with all steps registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(
        gateway: Box<dyn PersistenceGateway>,
        config: EngineConfig,
        clock: EngineClock,
    ) -> Self {
        let mut engine = ReconEngine::new(gateway, config, clock);

        // EXECUTION ORDER: fixed, never reordered.
        engine.register(Box::new(TrialExpirySubsystem::new()));
        engine.register(Box::new(OverdueSubsystem::new()));
        engine.register(Box::new(MigrationSubsystem::new()));
        engine.register(Box::new(AlertSubsystem::new()));
        engine
    }

    /// Wired engine over a fresh in-memory store, clock pinned to `today`.
    /// Used by integration tests.
    pub fn build_test(today: NaiveDate) -> EngineResult<Self> {
        let store = Store::in_memory()?;
        store.migrate()?;
        Ok(Self::build(
            Box::new(store),
            EngineConfig::default_test(),
            EngineClock::fixed_on(today),
        ))
    }

    /// Register a step. Call in the documented execution order.
    pub fn register(&mut self, step: Box<dyn PassStep>) {
        self.steps.push(step);
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.bus.subscribe(sink);
    }

    /// First load: read every collection, then normalize subscription
    /// ledger dates once for this engine instance.
    pub fn load(&mut self) -> EngineResult<Option<NormalizationReport>> {
        self.refresh()?;
        if self.normalized {
            return Ok(None);
        }
        let report = self.normalize_subscription_dates()?;
        self.normalized = true;
        Ok(Some(report))
    }

    /// Re-read every collection into the projection.
    /// On failure the previous projection is kept.
    pub fn refresh(&mut self) -> EngineResult<()> {
        let projection = Projection {
            clients:      self.gateway.list_clients()?,
            leads:        self.gateway.list_leads()?,
            trials:       self.gateway.list_trials()?,
            transactions: self.gateway.list_transactions()?,
        };
        self.projection = projection;
        Ok(())
    }

    /// One full reconciliation pass.
    ///
    /// Returns `PassInProgress` when another pass holds the gate.
    pub fn run_pass(&mut self) -> EngineResult<PassReport> {
        let _permit = self.gate.try_acquire().ok_or(EngineError::PassInProgress)?;

        let now = self.clock.now();
        let mut snapshot = PassSnapshot {
            clients: self.gateway.list_clients()?,
            trials:  self.gateway.list_trials()?,
            leads:   self.gateway.list_leads()?,
        };
        let mut report = PassReport::default();

        for step in &mut self.steps {
            let mut ctx = PassContext {
                gateway:  self.gateway.as_ref(),
                config:   &self.config,
                dedup:    &mut self.dedup,
                snapshot: &mut snapshot,
                report:   &mut report,
                now,
                today:    now.date_naive(),
            };
            let events = step.run(&mut ctx)?;
            report.events.extend(events);
        }

        let client_ids: HashSet<&str> = snapshot.clients.iter().map(|c| c.id.as_str()).collect();
        let trial_ids: HashSet<&str> = snapshot.trials.iter().map(|t| t.id.as_str()).collect();
        self.dedup.retain_known(&client_ids, &trial_ids);

        let changed = report.records_changed() + report.leads_created;
        if changed > 0 {
            report.events.push(EngineEvent::ClientsUpdated { changed });
        }
        self.bus.publish_all(&report.events);

        self.passes_run += 1;
        log::info!(
            "pass {}: {} records changed, {} leads created, {} events, {} failures",
            self.passes_run,
            report.records_changed(),
            report.leads_created,
            report.events.len(),
            report.failures.len()
        );

        self.projection.clients = snapshot.clients;
        self.projection.trials = snapshot.trials;
        self.projection.leads = snapshot.leads;
        self.projection.transactions = self.gateway.list_transactions()?;

        self.last_report = Some(report.clone());
        Ok(report)
    }

    /// Apply a signal from the host. Returns the events it raised.
    pub fn handle_signal(&mut self, signal: EngineSignal) -> EngineResult<Vec<EngineEvent>> {
        match signal {
            EngineSignal::SettingsChanged { plans } => {
                log::info!("settings changed: {} plans", plans.len());
                self.plans.replace(&plans);
                self.config.plans = plans;
                Ok(Vec::new())
            }
            EngineSignal::ClientsUpdated => {
                self.refresh()?;
                let events = alert_subsystem::scan(
                    &mut self.dedup,
                    &self.projection.clients,
                    &self.projection.trials,
                    self.clock.now(),
                    self.config.thresholds.expiring_window_days,
                );
                self.bus.publish_all(&events);
                Ok(events)
            }
        }
    }

    // ── Ledger ─────────────────────────────────────

    pub fn ledger(&self) -> RevenueLedger<'_> {
        RevenueLedger::new(self.gateway.as_ref(), &self.clock)
    }

    pub fn normalize_subscription_dates(&mut self) -> EngineResult<NormalizationReport> {
        let report = self
            .ledger()
            .normalize_subscription_dates(&self.projection.clients)?;
        if report.changed() {
            self.projection.transactions = self.gateway.list_transactions()?;
        }
        Ok(report)
    }

    pub fn commit_transaction(&mut self, id: &str) -> EngineResult<RevenueTransaction> {
        let txn = self.ledger().commit(id)?;
        self.projection.transactions = self.gateway.list_transactions()?;
        Ok(txn)
    }

    pub fn revert_transaction(&mut self, id: &str, reason: &str) -> EngineResult<RevenueTransaction> {
        let txn = self.ledger().revert(id, reason)?;
        self.projection.transactions = self.gateway.list_transactions()?;
        Ok(txn)
    }

    pub fn metrics(&self, period: Period, type_filter: Option<TransactionKind>) -> LedgerMetrics {
        ledger::metrics(
            &self.projection.transactions,
            self.projection.clients.len(),
            period,
            type_filter,
            self.clock.today(),
        )
    }

    pub fn visible_entries(
        &self,
        period: Period,
        type_filter: Option<TransactionKind>,
    ) -> Vec<&RevenueTransaction> {
        ledger::visible_entries(
            &self.projection.transactions,
            &self.projection.clients,
            period,
            type_filter,
            self.clock.today(),
            self.config.thresholds.expiring_window_days,
        )
    }

    // ── Read side ──────────────────────────────────

    pub fn classify_client(&self, client: &Subscriber) -> Classification {
        expiration::classify_with_window(
            &client.expiration_date,
            self.clock.today(),
            self.config.thresholds.expiring_window_days,
        )
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn gateway(&self) -> &dyn PersistenceGateway {
        self.gateway.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.plans
    }

    pub fn dedup(&self) -> &AlertDedup {
        &self.dedup
    }

    /// A handle on the single-flight gate, for hosts that trigger passes
    /// from more than one place.
    pub fn pass_gate(&self) -> PassGate {
        self.gate.clone()
    }

    pub fn passes_run(&self) -> u64 {
        self.passes_run
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    pub(crate) fn publish(&mut self, events: &[EngineEvent]) {
        self.bus.publish_all(events);
    }
}
