// ==========================================
// Fuel Dispatch - Dispatch configuration reader trait
// ==========================================
// Read-only interface; ConfigManager implements it over config_kv,
// tests implement it with fixed values.
// ==========================================

use crate::config::dispatch_config::DispatchConfig;
use crate::domain::types::FuelType;
use crate::engine::consumption::ConsumptionSettings;
use crate::engine::dispatch::PhaseTimings;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::error::Error;
use std::time::Duration;

#[async_trait]
pub trait DispatchConfigReader: Send + Sync {
    // ===== Phase durations =====

    /// Depot to stations (default 5000 ms)
    async fn get_outbound_transit_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Time spent unloading (default 3000 ms)
    async fn get_unload_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Stations back to depot (default 5000 ms)
    async fn get_return_transit_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Reloading at the depot (default 3000 ms)
    async fn get_reload_ms(&self) -> Result<u64, Box<dyn Error>>;

    // ===== Consumption =====

    /// Consumption tick period (default 10000 ms)
    async fn get_consumption_period_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Liters removed from every tank per tick (default 500)
    async fn get_consumption_step_l(&self) -> Result<f64, Box<dyn Error>>;

    // ===== Prices / planner =====

    async fn get_fuel_prices(&self) -> Result<BTreeMap<FuelType, f64>, Box<dyn Error>>;

    /// `None` when no planning service is configured
    async fn get_planner_endpoint(&self) -> Result<Option<String>, Box<dyn Error>>;

    async fn get_planner_timeout_ms(&self) -> Result<u64, Box<dyn Error>>;

    /// Reads every key and assembles a DispatchConfig
    async fn load_dispatch_config(&self) -> Result<DispatchConfig, Box<dyn Error>> {
        let outbound = self.get_outbound_transit_ms().await?;
        let unload = self.get_unload_ms().await?;
        let return_transit = self.get_return_transit_ms().await?;
        let reload = self.get_reload_ms().await?;
        let period = self.get_consumption_period_ms().await?;
        let step_l = self.get_consumption_step_l().await?;
        let fuel_prices = self.get_fuel_prices().await?;
        let planner_endpoint = self.get_planner_endpoint().await?;
        let planner_timeout = self.get_planner_timeout_ms().await?;

        Ok(DispatchConfig {
            timings: PhaseTimings {
                outbound: Duration::from_millis(outbound),
                unload: Duration::from_millis(unload),
                return_transit: Duration::from_millis(return_transit),
                reload: Duration::from_millis(reload),
            },
            consumption: ConsumptionSettings {
                period: Duration::from_millis(period),
                step_l,
            },
            fuel_prices,
            planner_endpoint,
            planner_timeout: Duration::from_millis(planner_timeout),
        })
    }
}
