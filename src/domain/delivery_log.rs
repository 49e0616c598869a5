// ==========================================
// Fuel Dispatch - Delivery ledger domain model
// ==========================================
// Append-only audit of completed deliveries.
// Entries are created by engine::ledger only; everything here is
// read-only once stamped.
// ==========================================

use crate::domain::types::FuelType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// DeliveryLogEntry - one completed delivery
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryLogEntry {
    // ===== Identity =====
    pub log_id: String,           // uuid v4
    pub logged_at: DateTime<Utc>, // non-decreasing across the ledger

    // ===== Dispatch =====
    pub truck_id: String,
    pub driver: String,
    pub fuel_type: FuelType,

    // ===== Volumes & cost =====
    #[serde(rename = "volume")]
    pub total_volume_l: f64, // volume loaded per the plan
    #[serde(default)]
    pub delivered_volume_l: f64, // volume actually accepted into tanks
    #[serde(rename = "cost")]
    pub total_cost: f64, // plan's estimated cost

    // ===== Route =====
    pub route: Vec<String>, // visited station names, plan order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedStep>,
}

impl DeliveryLogEntry {
    /// One-line human summary for CLI listings
    pub fn summary_text(&self) -> String {
        let mut text = format!(
            "{} {} {} {:.0} L (delivered {:.0} L), cost {:.2}, route: {}",
            self.logged_at.format("%Y-%m-%d %H:%M:%S"),
            self.truck_id,
            self.fuel_type,
            self.total_volume_l,
            self.delivered_volume_l,
            self.total_cost,
            self.route.join(" -> "),
        );
        if !self.skipped.is_empty() {
            text.push_str(&format!(", skipped {}", self.skipped.len()));
        }
        text
    }

    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }
}

// ==========================================
// SkippedStep - unload step that was not applied
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStep {
    pub station_name: String,
    pub reason: String,
}

impl SkippedStep {
    pub fn new(station_name: &str, reason: impl Into<String>) -> Self {
        Self {
            station_name: station_name.to_string(),
            reason: reason.into(),
        }
    }
}

// ==========================================
// DeliveryDraft - entry before the ledger stamps it
// ==========================================
// Built by the interpreter at accept time; id/timestamp/delivered volume
// are filled in when the ledger records it.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryDraft {
    pub truck_id: String,
    pub driver: String,
    pub fuel_type: FuelType,
    pub total_volume_l: f64,
    pub total_cost: f64,
    pub route: Vec<String>,
}
