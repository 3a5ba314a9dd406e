//! User-initiated operations on subscribers, trials and leads.
//!
//! Unlike a pass, these propagate every error to the caller. Each one
//! re-reads the record it changes, writes through the gateway, and
//! refreshes the projection afterwards.

use serde::Serialize;

use crate::{
    alert_subsystem,
    dates,
    engine::ReconEngine,
    error::{EngineError, EngineResult},
    gateway::RecordKind,
    ledger::NewEntry,
    model::{
        Lead, LifecycleStatus, PaymentStatus, RevenueTransaction, Subscriber, SystemLogEntry,
        SystemLogKind, Trial,
    },
};

/// What a renewal did.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenewalReceipt {
    pub client: Subscriber,
    pub previous_expiration: String,
    pub entry: RevenueTransaction,
}

impl ReconEngine {
    fn find_client(&self, id: &str) -> EngineResult<Subscriber> {
        self.gateway
            .list_clients()?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| EngineError::NotFound {
                kind: RecordKind::Client,
                id: id.to_string(),
            })
    }

    /// Re-run the alert scan for one subscriber after it changed.
    fn observe_client(&mut self, client: &Subscriber) {
        let events = alert_subsystem::client_alerts(
            &mut self.dedup,
            client,
            self.clock.today(),
            self.config.thresholds.expiring_window_days,
        );
        self.publish(&events);
    }

    /// Extend a subscription by one billing cycle, or to `explicit_date`.
    ///
    /// The cycle is added to the current expiration, not to today, so a
    /// late renewal does not shift the billing day. An unreadable stored
    /// expiration renews from today. A blank `explicit_date` counts as absent.
    pub fn renew_client(
        &mut self,
        id: &str,
        explicit_date: Option<&str>,
    ) -> EngineResult<RenewalReceipt> {
        let client = self.find_client(id)?;
        let today = self.clock.today();

        let new_expiration = match explicit_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                dates::parse_date(raw).ok_or_else(|| EngineError::InvalidDate(raw.to_string()))?
            }
            None => {
                let base = dates::parse_date(&client.expiration_date).unwrap_or(today);
                dates::add_months_stable(base, self.plans.cadence_for(&client.plan))
            }
        };

        let previous_expiration = client.expiration_date.clone();
        let mut renewed = client;
        renewed.expiration_date = dates::format_for_storage(new_expiration);
        renewed.payment_status = PaymentStatus::Paid;
        renewed.status = LifecycleStatus::Active;
        self.gateway.update_client(&renewed)?;

        let entry = NewEntry::committed(renewed.price, today).with_cost(
            self.config.server_cost(renewed.server.as_deref()),
            renewed.server.clone(),
        );
        let entry = self.ledger().add_renewal_entry(&renewed, entry)?;

        self.gateway.add_system_log(SystemLogEntry::new(
            SystemLogKind::ClientRenewal,
            Some(&renewed.id),
            &renewed.name,
            format!(
                "Renewed {} until {}",
                renewed.plan,
                dates::format_for_display(new_expiration)
            ),
            self.clock.now(),
        ))?;
        log::info!(
            "renewal: {} {} → {}",
            renewed.name,
            previous_expiration,
            renewed.expiration_date
        );

        self.observe_client(&renewed);
        self.refresh()?;
        Ok(RenewalReceipt {
            client: renewed,
            previous_expiration,
            entry,
        })
    }

    /// Paid + Active, expiration untouched, no ledger entry.
    pub fn mark_client_as_paid(&mut self, id: &str) -> EngineResult<Subscriber> {
        let mut client = self.find_client(id)?;
        client.payment_status = PaymentStatus::Paid;
        client.status = LifecycleStatus::Active;
        self.gateway.update_client(&client)?;
        log::info!("payment: {} marked as paid", client.name);

        self.observe_client(&client);
        self.refresh()?;
        Ok(client)
    }

    /// Store a new subscriber and its opening subscription entry, dated at
    /// activation. A blank expiration defaults to one plan cycle after
    /// activation, and a zero price to the catalog price for the plan. Both
    /// dates are stored in `YYYY-MM-DD` form.
    pub fn add_client(&mut self, draft: Subscriber) -> EngineResult<Subscriber> {
        let activation = dates::parse_date(&draft.activation_date)
            .ok_or_else(|| EngineError::InvalidDate(draft.activation_date.clone()))?;
        let expiration = if draft.expiration_date.trim().is_empty() {
            dates::add_months_stable(activation, self.plans.cadence_for(&draft.plan))
        } else {
            dates::parse_date(&draft.expiration_date)
                .ok_or_else(|| EngineError::InvalidDate(draft.expiration_date.clone()))?
        };

        let mut client = draft;
        if client.price <= 0.0 {
            if let Some(price) = self.plans.price_for(&client.plan) {
                client.price = price;
            }
        }
        client.activation_date = dates::format_for_storage(activation);
        client.expiration_date = dates::format_for_storage(expiration);
        let stored = self.gateway.add_client(client)?;

        let entry = NewEntry::committed(stored.price, activation).with_cost(
            self.config.server_cost(stored.server.as_deref()),
            stored.server.clone(),
        );
        self.ledger().add_subscription_entry(&stored, entry)?;
        log::info!("client: added {} on plan {}", stored.name, stored.plan);

        self.observe_client(&stored);
        self.refresh()?;
        Ok(stored)
    }

    /// Remove a subscriber. Its ledger entries stay for audit.
    pub fn delete_client(&mut self, id: &str) -> EngineResult<()> {
        self.gateway.delete_client(id)?;
        self.dedup.forget_client(id);
        log::info!("client: deleted {id}");
        self.refresh()
    }

    pub fn add_trial(&mut self, trial: Trial) -> EngineResult<Trial> {
        let stored = self.gateway.add_trial(trial)?;
        log::info!("trial: added {} ending {}", stored.client_name, stored.ends_at);
        self.refresh()?;
        Ok(stored)
    }

    pub fn add_lead(&mut self, lead: Lead) -> EngineResult<Lead> {
        let stored = self.gateway.add_lead(lead)?;
        log::info!("lead: added {}", stored.name);
        self.refresh()?;
        Ok(stored)
    }
}
