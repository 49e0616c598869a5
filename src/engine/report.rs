// ==========================================
// Fuel Dispatch - Revenue report
// ==========================================
// revenue(entry) = volume loaded x price(fuel type)
// Fuel types with zero revenue are left out of the breakdown.
// ==========================================

use crate::domain::delivery_log::DeliveryLogEntry;
use crate::domain::types::FuelType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelRevenue {
    pub volume_l: f64,
    pub revenue: f64,
    pub deliveries: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub deliveries: usize,
    pub total_volume_l: f64,
    pub total_revenue: f64,
    pub by_fuel: BTreeMap<FuelType, FuelRevenue>,
}

impl RevenueReport {
    pub fn build(entries: &[DeliveryLogEntry], prices: &BTreeMap<FuelType, f64>) -> Self {
        let mut report = RevenueReport {
            deliveries: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            let price = prices.get(&entry.fuel_type).copied().unwrap_or(0.0);
            let revenue = entry.total_volume_l * price;

            report.total_volume_l += entry.total_volume_l;
            report.total_revenue += revenue;

            let line = report.by_fuel.entry(entry.fuel_type).or_default();
            line.volume_l += entry.total_volume_l;
            line.revenue += revenue;
            line.deliveries += 1;
        }

        report.by_fuel.retain(|_, line| line.revenue != 0.0);
        report
    }
}
