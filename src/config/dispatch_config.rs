// ==========================================
// Fuel Dispatch - Resolved runtime configuration
// ==========================================

use crate::domain::types::FuelType;
use crate::engine::consumption::ConsumptionSettings;
use crate::engine::dispatch::PhaseTimings;
use crate::engine::pricing::PriceBook;
use std::collections::BTreeMap;
use std::time::Duration;

/// Everything the engine needs from config_kv, with defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchConfig {
    // ===== Phase durations (simulation time) =====
    pub timings: PhaseTimings,

    // ===== Passive consumption =====
    pub consumption: ConsumptionSettings,

    // ===== Prices =====
    pub fuel_prices: BTreeMap<FuelType, f64>,

    // ===== External planner =====
    pub planner_endpoint: Option<String>, // None: offline sequential planner
    pub planner_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timings: PhaseTimings::default(),
            consumption: ConsumptionSettings::default(),
            fuel_prices: PriceBook::default_prices(),
            planner_endpoint: None,
            planner_timeout: Duration::from_secs(60),
        }
    }
}
