// ==========================================
// Fuel Dispatch - Configuration manager
// ==========================================
// Storage: config_kv table (scope_id + key -> value), global scope.
// Missing or malformed values fall back to defaults with a warning.
// ==========================================

use crate::config::dispatch_config_trait::DispatchConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::types::FuelType;
use crate::engine::pricing::PriceBook;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// Opens its own connection to `db_path`
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Shares an existing connection (PRAGMAs are re-applied, idempotent)
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Parses a numeric key; malformed values are logged and replaced by `default`
    fn get_number_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + std::fmt::Display + Copy,
    {
        let raw = match self.get_config_value(key)? {
            Some(raw) => raw,
            None => return Ok(default),
        };
        match raw.trim().parse::<T>() {
            Ok(value) => Ok(value),
            Err(_) => {
                tracing::warn!(config_key = key, raw_value = %raw, default = %default, "malformed config value, using default");
                Ok(default)
            }
        }
    }

    /// Reads a global value (None when absent)
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// Upserts a global value
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value, "config updated");
        Ok(())
    }

    /// All global values, sorted by key
    pub fn list_global_config(&self) -> Result<BTreeMap<String, String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("lock poisoned: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    // ===== Prices =====

    /// Persists one fuel price (`fuel_price/{code}`)
    pub fn set_fuel_price(&self, fuel_type: FuelType, price: f64) -> Result<(), Box<dyn Error>> {
        self.set_global_config_value(&config_keys::fuel_price(fuel_type), &price.to_string())
    }
}

// ==========================================
// DispatchConfigReader implementation
// ==========================================
#[async_trait]
impl DispatchConfigReader for ConfigManager {
    async fn get_outbound_transit_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::OUTBOUND_TRANSIT_MS, 5_000)
    }

    async fn get_unload_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::UNLOAD_MS, 3_000)
    }

    async fn get_return_transit_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::RETURN_TRANSIT_MS, 5_000)
    }

    async fn get_reload_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::RELOAD_MS, 3_000)
    }

    async fn get_consumption_period_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::CONSUMPTION_PERIOD_MS, 10_000)
    }

    async fn get_consumption_step_l(&self) -> Result<f64, Box<dyn Error>> {
        let step: f64 = self.get_number_or_default(config_keys::CONSUMPTION_STEP_L, 500.0)?;
        if !step.is_finite() || step < 0.0 {
            tracing::warn!(config_key = config_keys::CONSUMPTION_STEP_L, step, "invalid consumption step, using 500");
            return Ok(500.0);
        }
        Ok(step)
    }

    async fn get_fuel_prices(&self) -> Result<BTreeMap<FuelType, f64>, Box<dyn Error>> {
        let mut prices = PriceBook::default_prices();
        for fuel_type in FuelType::ALL {
            let key = config_keys::fuel_price(fuel_type);
            let default = prices.get(&fuel_type).copied().unwrap_or(0.0);
            let price = self.get_number_or_default(&key, default)?;
            if PriceBook::validate_price(fuel_type, price).is_ok() {
                prices.insert(fuel_type, price);
            } else {
                tracing::warn!(config_key = %key, price, "invalid stored price, using default");
            }
        }
        Ok(prices)
    }

    async fn get_planner_endpoint(&self) -> Result<Option<String>, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::PLANNER_ENDPOINT, "")?;
        let trimmed = value.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }

    async fn get_planner_timeout_ms(&self) -> Result<u64, Box<dyn Error>> {
        self.get_number_or_default(config_keys::PLANNER_TIMEOUT_MS, 60_000)
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    use crate::domain::types::FuelType;

    // Phase durations
    pub const OUTBOUND_TRANSIT_MS: &str = "outbound_transit_ms";
    pub const UNLOAD_MS: &str = "unload_ms";
    pub const RETURN_TRANSIT_MS: &str = "return_transit_ms";
    pub const RELOAD_MS: &str = "reload_ms";

    // Consumption
    pub const CONSUMPTION_PERIOD_MS: &str = "consumption_period_ms";
    pub const CONSUMPTION_STEP_L: &str = "consumption_step_l";

    // Planner
    pub const PLANNER_ENDPOINT: &str = "planner_endpoint";
    pub const PLANNER_TIMEOUT_MS: &str = "planner_timeout_ms";

    // Prices: fuel_price/{code}
    pub const FUEL_PRICE_PREFIX: &str = "fuel_price/";

    pub fn fuel_price(fuel_type: FuelType) -> String {
        format!("{}{}", FUEL_PRICE_PREFIX, fuel_type.code())
    }
}
