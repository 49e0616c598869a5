// ==========================================
// Fuel Dispatch - Configuration API
// ==========================================
// Reads and writes global config_kv entries; fuel price changes are
// applied to the running price book and persisted together.
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::error::{config_error, ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::domain::types::FuelType;
use crate::engine::DispatchOrchestrator;

// ==========================================
// ConfigApi
// ==========================================
pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
    orchestrator: Arc<DispatchOrchestrator>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>, orchestrator: Arc<DispatchOrchestrator>) -> Self {
        Self {
            config_manager,
            orchestrator,
        }
    }

    /// All global entries, sorted by key
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let configs = self
            .config_manager
            .list_global_config()
            .map_err(config_error)?;
        Ok(configs
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect())
    }

    pub fn get_config(&self, key: &str) -> ApiResult<Option<ConfigItem>> {
        let value = self
            .config_manager
            .get_global_config_value(key)
            .map_err(config_error)?;
        Ok(value.map(|value| ConfigItem {
            key: key.to_string(),
            value,
        }))
    }

    /// Upserts one entry. Timing and planner keys take effect on next start.
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        if key.trim().is_empty() {
            return Err(ApiError::InvalidInput("config key must not be empty".to_string()));
        }
        self.config_manager
            .set_global_config_value(key.trim(), value)
            .map_err(config_error)
    }

    // ===== Fuel prices =====

    pub fn fuel_prices(&self) -> BTreeMap<FuelType, f64> {
        self.orchestrator.fuel_prices()
    }

    /// Validates, applies and persists a price
    pub fn set_fuel_price(&self, fuel_type: FuelType, price: f64) -> ApiResult<()> {
        self.orchestrator.adjust_fuel_price(fuel_type, price)?;
        self.config_manager
            .set_fuel_price(fuel_type, price)
            .map_err(config_error)
    }
}

// ==========================================
// ConfigItem
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config_manager::config_keys;
    use crate::config::DispatchConfigReader;

    fn api() -> (tempfile::NamedTempFile, ConfigApi) {
        let db = tempfile::NamedTempFile::new().unwrap();
        let conn = crate::db::open_sqlite_connection(db.path().to_str().unwrap()).unwrap();
        crate::db::init_schema(&conn).unwrap();
        let manager = ConfigManager::from_connection(Arc::new(std::sync::Mutex::new(conn))).unwrap();
        let api = ConfigApi::new(
            Arc::new(manager),
            Arc::new(DispatchOrchestrator::with_defaults()),
        );
        (db, api)
    }

    #[tokio::test]
    async fn test_set_fuel_price_applies_and_persists() {
        let (_db, api) = api();
        api.set_fuel_price(FuelType::Ai95, 2.55).unwrap();
        assert_eq!(api.fuel_prices()[&FuelType::Ai95], 2.55);

        let prices = api.config_manager.get_fuel_prices().await.unwrap();
        assert_eq!(prices[&FuelType::Ai95], 2.55);
    }

    #[test]
    fn test_invalid_price_not_persisted() {
        let (_db, api) = api();
        let err = api.set_fuel_price(FuelType::Ai92, -1.0).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(api
            .get_config(&config_keys::fuel_price(FuelType::Ai92))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_and_list() {
        let (_db, api) = api();
        api.update_config(config_keys::UNLOAD_MS, "1500").unwrap();
        assert!(api.update_config("  ", "x").is_err());

        let items = api.list_configs().unwrap();
        assert!(items.contains(&ConfigItem {
            key: config_keys::UNLOAD_MS.to_string(),
            value: "1500".to_string(),
        }));
    }
}
