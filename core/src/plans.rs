//! Plan catalog: maps a plan name to its renewal cadence in months.
//!
//! Lookup order:
//!   1. configured plans, matched on the normalized full name
//!   2. built-in Portuguese/English names, matched per word; two adjacent
//!      words are tried joined first, so "Semi-Annual" reads as "semiannual"
//!   3. one month
//!
//! Names are compared lowercased with accents stripped, so "Plano Anual",
//! "ANUAL" and "anual" all resolve the same way.

use std::collections::HashMap;

use crate::config::PlanConfig;

pub const DEFAULT_CADENCE_MONTHS: u32 = 1;

const BUILT_IN: &[(&str, u32)] = &[
    ("mensal", 1),
    ("monthly", 1),
    ("bimestral", 2),
    ("bimonthly", 2),
    ("trimestral", 3),
    ("quarterly", 3),
    ("semestral", 6),
    ("semianual", 6),
    ("semiannual", 6),
    ("semiannually", 6),
    ("anual", 12),
    ("annual", 12),
    ("yearly", 12),
];

#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    configured: HashMap<String, PlanConfig>,
}

impl PlanCatalog {
    pub fn new(plans: &[PlanConfig]) -> Self {
        let mut catalog = Self::default();
        catalog.replace(plans);
        catalog
    }

    /// Swap in a new plan list, e.g. after a settings edit.
    /// Entries with a zero cadence are ignored.
    pub fn replace(&mut self, plans: &[PlanConfig]) {
        self.configured = plans
            .iter()
            .filter(|p| p.cadence_months > 0)
            .map(|p| (normalize_plan_name(&p.name), p.clone()))
            .collect();
        log::debug!("plans: catalog now holds {} configured plans", self.configured.len());
    }

    pub fn cadence_for(&self, plan: &str) -> u32 {
        let key = normalize_plan_name(plan);
        if let Some(p) = self.configured.get(&key) {
            return p.cadence_months;
        }
        let words: Vec<&str> = key
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        for (i, word) in words.iter().enumerate() {
            if let Some(next) = words.get(i + 1) {
                if let Some(months) = built_in_cadence(&format!("{word}{next}")) {
                    return months;
                }
            }
            if let Some(months) = built_in_cadence(word) {
                return months;
            }
        }
        DEFAULT_CADENCE_MONTHS
    }

    /// Catalog price for a configured plan.
    pub fn price_for(&self, plan: &str) -> Option<f64> {
        self.configured
            .get(&normalize_plan_name(plan))
            .and_then(|p| p.price)
    }

    pub fn len(&self) -> usize {
        self.configured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configured.is_empty()
    }
}

fn built_in_cadence(word: &str) -> Option<u32> {
    BUILT_IN
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, months)| *months)
}

/// Lowercase, trimmed, Latin accents folded to their base letter.
pub fn normalize_plan_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}
