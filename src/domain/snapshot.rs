// ==========================================
// Fuel Dispatch - Persistence snapshot
// ==========================================

use crate::domain::delivery_log::DeliveryLogEntry;
use crate::domain::station::Station;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// `{stations, ledger}` as persisted and restored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub stations: Vec<Station>,
    pub ledger: Vec<DeliveryLogEntry>,
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(stations: Vec<Station>, ledger: Vec<DeliveryLogEntry>) -> Self {
        Self {
            stations,
            ledger,
            taken_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty() && self.ledger.is_empty()
    }

    /// Checks every station and ledger invariant; returns the first violation
    pub fn validate(&self) -> Result<(), String> {
        let mut station_ids = HashSet::new();
        let mut station_names = HashSet::new();
        for station in &self.stations {
            if !station_ids.insert(station.id.as_str()) {
                return Err(format!("duplicate station id {}", station.id));
            }
            // Unload steps resolve stations by name
            if !station_names.insert(station.name.as_str()) {
                return Err(format!("duplicate station name {}", station.name));
            }
            station.check_invariants()?;
        }

        let mut log_ids = HashSet::new();
        let mut previous: Option<DateTime<Utc>> = None;
        for entry in &self.ledger {
            if !log_ids.insert(entry.log_id.as_str()) {
                return Err(format!("duplicate ledger id {}", entry.log_id));
            }
            if let Some(prev) = previous {
                if entry.logged_at < prev {
                    return Err(format!(
                        "ledger entry {} is older than its predecessor",
                        entry.log_id
                    ));
                }
            }
            previous = Some(entry.logged_at);
        }
        Ok(())
    }
}
