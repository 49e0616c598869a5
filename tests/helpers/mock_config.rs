// ==========================================
// Mock configuration for integration tests
// ==========================================

use async_trait::async_trait;
use fuel_dispatch::config::DispatchConfigReader;
use fuel_dispatch::domain::types::FuelType;
use fuel_dispatch::engine::PriceBook;
use std::collections::BTreeMap;
use std::error::Error;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub outbound_transit_ms: u64,
    pub unload_ms: u64,
    pub return_transit_ms: u64,
    pub reload_ms: u64,
    pub consumption_period_ms: u64,
    pub consumption_step_l: f64,
    pub fuel_prices: BTreeMap<FuelType, f64>,
    pub planner_endpoint: Option<String>,
    pub planner_timeout_ms: u64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            outbound_transit_ms: 5_000,
            unload_ms: 3_000,
            return_transit_ms: 5_000,
            reload_ms: 3_000,
            consumption_period_ms: 10_000,
            consumption_step_l: 500.0,
            fuel_prices: PriceBook::default_prices(),
            planner_endpoint: None,
            planner_timeout_ms: 60_000,
        }
    }
}

impl MockConfig {
    /// Every phase and the consumption period set to `ms`
    pub fn fast(ms: u64) -> Self {
        Self {
            outbound_transit_ms: ms,
            unload_ms: ms,
            return_transit_ms: ms,
            reload_ms: ms,
            consumption_period_ms: ms,
            ..Self::default()
        }
    }

    pub fn with_planner(mut self, endpoint: &str) -> Self {
        self.planner_endpoint = Some(endpoint.to_string());
        self
    }
}

#[async_trait]
impl DispatchConfigReader for MockConfig {
    async fn get_outbound_transit_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.outbound_transit_ms)
    }

    async fn get_unload_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.unload_ms)
    }

    async fn get_return_transit_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.return_transit_ms)
    }

    async fn get_reload_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.reload_ms)
    }

    async fn get_consumption_period_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.consumption_period_ms)
    }

    async fn get_consumption_step_l(&self) -> Result<f64, Box<dyn Error>> {
        Ok(self.consumption_step_l)
    }

    async fn get_fuel_prices(&self) -> Result<BTreeMap<FuelType, f64>, Box<dyn Error>> {
        Ok(self.fuel_prices.clone())
    }

    async fn get_planner_endpoint(&self) -> Result<Option<String>, Box<dyn Error>> {
        Ok(self.planner_endpoint.clone())
    }

    async fn get_planner_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        Ok(self.planner_timeout_ms)
    }
}
