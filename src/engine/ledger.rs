// ==========================================
// Fuel Dispatch - Delivery ledger
// ==========================================
// Append-only; the only place entries are created.
// Timestamps are clamped so insertion order is also time order.
// ==========================================

use crate::domain::delivery_log::{DeliveryDraft, DeliveryLogEntry, SkippedStep};
use crate::engine::guard;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct DeliveryLedger {
    entries: RwLock<Vec<DeliveryLogEntry>>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps a draft and appends it
    pub fn record(
        &self,
        draft: DeliveryDraft,
        delivered_volume_l: f64,
        skipped: Vec<SkippedStep>,
    ) -> DeliveryLogEntry {
        let mut entries = guard::write(&self.entries);

        let now = Utc::now();
        let logged_at = match entries.last() {
            Some(last) if last.logged_at > now => last.logged_at,
            _ => now,
        };

        let entry = DeliveryLogEntry {
            log_id: Uuid::new_v4().to_string(),
            logged_at,
            truck_id: draft.truck_id,
            driver: draft.driver,
            fuel_type: draft.fuel_type,
            total_volume_l: draft.total_volume_l,
            delivered_volume_l,
            total_cost: draft.total_cost,
            route: draft.route,
            skipped,
        };

        info!(
            log_id = %entry.log_id,
            truck_id = %entry.truck_id,
            fuel_type = %entry.fuel_type,
            volume_l = entry.total_volume_l,
            delivered_l = entry.delivered_volume_l,
            stations = entry.route.len(),
            "delivery recorded"
        );

        entries.push(entry.clone());
        entry
    }

    /// All entries in insertion order
    pub fn entries(&self) -> Vec<DeliveryLogEntry> {
        guard::read(&self.entries).clone()
    }

    pub fn entries_for_truck(&self, truck_id: &str) -> Vec<DeliveryLogEntry> {
        guard::read(&self.entries)
            .iter()
            .filter(|e| e.truck_id == truck_id)
            .cloned()
            .collect()
    }

    pub fn find(&self, log_id: &str) -> Option<DeliveryLogEntry> {
        guard::read(&self.entries)
            .iter()
            .find(|e| e.log_id == log_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        guard::read(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unique ids and non-decreasing timestamps
    pub fn validate_history(entries: &[DeliveryLogEntry]) -> Result<(), String> {
        let mut ids = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            if !ids.insert(entry.log_id.as_str()) {
                return Err(format!("duplicate ledger id {}", entry.log_id));
            }
            if i > 0 && entry.logged_at < entries[i - 1].logged_at {
                return Err(format!("ledger entry {} is out of order", entry.log_id));
            }
        }
        Ok(())
    }

    /// Replaces the history after validating it
    pub fn replace_all(&self, entries: Vec<DeliveryLogEntry>) -> Result<(), String> {
        Self::validate_history(&entries)?;
        *guard::write(&self.entries) = entries;
        Ok(())
    }
}
