//! "Already alerted" bookkeeping.
//!
//! One `AlertDedup` lives inside each engine instance. Nothing here is
//! persisted: a restarted engine alerts once more for conditions that are
//! still true, then goes quiet again.
//!
//! Each `note_*` method returns true exactly when an alert should fire.
//! Each `clear_*` method ends an episode so the next one can fire again.

use crate::types::{DayCount, EntityId};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default, Clone)]
pub struct AlertDedup {
    overdue: HashSet<EntityId>,
    escalated: HashSet<EntityId>,
    /// Last day count an expiring alert fired for.
    expiring: HashMap<EntityId, DayCount>,
    trial_expired: HashSet<EntityId>,
    /// Duplicate-migration notices already shown, keyed by client or trial id.
    duplicate_notices: HashSet<EntityId>,
}

impl AlertDedup {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Overdue episodes ───────────────────────────

    pub fn note_overdue(&mut self, client_id: &str) -> bool {
        self.overdue.insert(client_id.to_string())
    }

    /// Tolerance breach within the current overdue episode.
    pub fn note_escalation(&mut self, client_id: &str) -> bool {
        self.escalated.insert(client_id.to_string())
    }

    pub fn clear_overdue(&mut self, client_id: &str) {
        self.overdue.remove(client_id);
        self.escalated.remove(client_id);
    }

    pub fn is_overdue_alerted(&self, client_id: &str) -> bool {
        self.overdue.contains(client_id)
    }

    pub fn is_escalated(&self, client_id: &str) -> bool {
        self.escalated.contains(client_id)
    }

    // ── Expiring countdown ─────────────────────────

    /// Fires when the remaining day count differs from the last one alerted.
    pub fn note_expiring(&mut self, client_id: &str, days: DayCount) -> bool {
        match self.expiring.insert(client_id.to_string(), days) {
            Some(previous) => previous != days,
            None => true,
        }
    }

    pub fn clear_expiring(&mut self, client_id: &str) {
        self.expiring.remove(client_id);
    }

    // ── Trials ─────────────────────────────────────

    pub fn note_trial_expired(&mut self, trial_id: &str) -> bool {
        self.trial_expired.insert(trial_id.to_string())
    }

    pub fn clear_trial_expired(&mut self, trial_id: &str) {
        self.trial_expired.remove(trial_id);
    }

    // ── Migration notices ──────────────────────────

    pub fn note_duplicate_notice(&mut self, entity_id: &str) -> bool {
        self.duplicate_notices.insert(entity_id.to_string())
    }

    // ── Housekeeping ───────────────────────────────

    /// Drop every trace of a subscriber, e.g. after it is deleted.
    pub fn forget_client(&mut self, client_id: &str) {
        self.clear_overdue(client_id);
        self.clear_expiring(client_id);
        self.duplicate_notices.remove(client_id);
    }

    /// Keep only ids that still exist, so memory tracks the live collections.
    pub fn retain_known(&mut self, client_ids: &HashSet<&str>, trial_ids: &HashSet<&str>) {
        self.overdue.retain(|id| client_ids.contains(id.as_str()));
        self.escalated.retain(|id| client_ids.contains(id.as_str()));
        self.expiring.retain(|id, _| client_ids.contains(id.as_str()));
        self.trial_expired.retain(|id| trial_ids.contains(id.as_str()));
        self.duplicate_notices
            .retain(|id| client_ids.contains(id.as_str()) || trial_ids.contains(id.as_str()));
    }

    /// Total tracked entries across every map.
    pub fn tracked(&self) -> usize {
        self.overdue.len()
            + self.escalated.len()
            + self.expiring.len()
            + self.trial_expired.len()
            + self.duplicate_notices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overdue_fires_once_per_episode() {
        let mut d = AlertDedup::new();
        assert!(d.note_overdue("c1"));
        assert!(!d.note_overdue("c1"));
        d.clear_overdue("c1");
        assert!(d.note_overdue("c1"));
    }

    #[test]
    fn expiring_fires_when_day_count_changes() {
        let mut d = AlertDedup::new();
        assert!(d.note_expiring("c1", 3));
        assert!(!d.note_expiring("c1", 3));
        assert!(d.note_expiring("c1", 2));
        assert!(!d.note_expiring("c1", 2));
        d.clear_expiring("c1");
        assert!(d.note_expiring("c1", 2));
    }

    #[test]
    fn clearing_overdue_also_resets_escalation() {
        let mut d = AlertDedup::new();
        assert!(d.note_escalation("c1"));
        assert!(!d.note_escalation("c1"));
        d.clear_overdue("c1");
        assert!(d.note_escalation("c1"));
    }

    #[test]
    fn retain_known_prunes_vanished_ids() {
        let mut d = AlertDedup::new();
        d.note_overdue("gone");
        d.note_overdue("kept");
        d.note_expiring("gone", 4);
        d.note_trial_expired("t-gone");
        d.note_trial_expired("t-kept");
        d.note_duplicate_notice("t-kept");

        let clients: HashSet<&str> = ["kept"].into_iter().collect();
        let trials: HashSet<&str> = ["t-kept"].into_iter().collect();
        d.retain_known(&clients, &trials);

        assert!(d.is_overdue_alerted("kept"));
        assert!(!d.is_overdue_alerted("gone"));
        assert_eq!(d.tracked(), 3);
    }
}
