use crate::types::DayCount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One entry in the plan catalog. Settings edits replace the whole list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanConfig {
    pub name: String,
    pub cadence_months: u32,
    #[serde(default)]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
struct PlanCatalogFile {
    plans: Vec<PlanConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Days-to-expiration window that counts as "expiring soon".
    pub expiring_window_days: DayCount,
    /// Days overdue before a subscriber is migrated to the pipeline.
    pub client_migration_days: DayCount,
    /// Days past a trial's end before it is migrated to the pipeline.
    pub trial_migration_days: DayCount,
    /// Grace window during which an overdue subscriber is not escalated.
    pub overdue_tolerance_days: DayCount,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            expiring_window_days: 7,
            client_migration_days: 10,
            trial_migration_days: 5,
            overdue_tolerance_days: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EngineFile {
    #[serde(default)]
    thresholds: Thresholds,
    #[serde(default = "default_pass_interval_secs")]
    pass_interval_secs: u64,
    #[serde(default)]
    server_costs: HashMap<String, f64>,
}

fn default_pass_interval_secs() -> u64 {
    300
}

/// Longest accepted pass interval: one week.
pub const MAX_PASS_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub thresholds: Thresholds,
    pub pass_interval_secs: u64,
    /// Monthly cost per server name; snapshotted onto ledger entries.
    pub server_costs: HashMap<String, f64>,
    pub plans: Vec<PlanConfig>,
}

impl EngineConfig {
    /// Load from the data/ directory.
    /// In tests, use EngineConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let engine_path = format!("{data_dir}/engine.json");
        let engine_content = std::fs::read_to_string(&engine_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {engine_path}: {e}"))?;
        let engine_file: EngineFile = serde_json::from_str(&engine_content)
            .map_err(|e| anyhow::anyhow!("Invalid {engine_path}: {e}"))?;

        let plans_path = format!("{data_dir}/plans.json");
        let plans_content = std::fs::read_to_string(&plans_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {plans_path}: {e}"))?;
        let plans_file: PlanCatalogFile = serde_json::from_str(&plans_content)
            .map_err(|e| anyhow::anyhow!("Invalid {plans_path}: {e}"))?;

        if !(1..=MAX_PASS_INTERVAL_SECS).contains(&engine_file.pass_interval_secs) {
            anyhow::bail!(
                "pass_interval_secs in {engine_path} must be between 1 and {MAX_PASS_INTERVAL_SECS}, got {}",
                engine_file.pass_interval_secs
            );
        }
        if let Some(bad) = plans_file.plans.iter().find(|p| p.cadence_months == 0) {
            anyhow::bail!("Plan {:?} in {plans_path} has a zero cadence", bad.name);
        }

        Ok(Self {
            thresholds: engine_file.thresholds,
            pass_interval_secs: engine_file.pass_interval_secs,
            server_costs: engine_file.server_costs,
            plans: plans_file.plans,
        })
    }

    /// Cost snapshot for a server name, if the server is priced.
    pub fn server_cost(&self, server: Option<&str>) -> Option<f64> {
        server.and_then(|s| self.server_costs.get(s).copied())
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let mut server_costs = HashMap::new();
        server_costs.insert("alpha".to_string(), 4.0);
        server_costs.insert("beta".to_string(), 6.5);
        Self {
            thresholds: Thresholds::default(),
            pass_interval_secs: 300,
            server_costs,
            plans: vec![PlanConfig {
                name: "Bimestral".into(),
                cadence_months: 2,
                price: Some(50.0),
            }],
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            pass_interval_secs: default_pass_interval_secs(),
            server_costs: HashMap::new(),
            plans: Vec::new(),
        }
    }
}
