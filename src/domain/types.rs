// ==========================================
// Fuel Dispatch - Domain type definitions
// ==========================================
// Closed enumerations shared by every layer:
// fuel grades, truck operational status, route step kinds
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Fuel type
// ==========================================
// Wire labels follow the planner contract (АИ-92 / АИ-95 / АИ-98 / ДТ),
// Latin aliases are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FuelType {
    #[serde(rename = "АИ-92", alias = "AI-92", alias = "AI92")]
    Ai92,
    #[serde(rename = "АИ-95", alias = "AI-95", alias = "AI95")]
    Ai95,
    #[serde(rename = "АИ-98", alias = "AI-98", alias = "AI98")]
    Ai98,
    #[serde(rename = "ДТ", alias = "Diesel", alias = "DT")]
    Diesel,
}

impl FuelType {
    pub const ALL: [FuelType; 4] = [
        FuelType::Ai92,
        FuelType::Ai95,
        FuelType::Ai98,
        FuelType::Diesel,
    ];

    /// Planner-facing label (also used in unload action text)
    pub fn label(&self) -> &'static str {
        match self {
            FuelType::Ai92 => "АИ-92",
            FuelType::Ai95 => "АИ-95",
            FuelType::Ai98 => "АИ-98",
            FuelType::Diesel => "ДТ",
        }
    }

    /// ASCII code for database columns and config keys
    pub fn code(&self) -> &'static str {
        match self {
            FuelType::Ai92 => "AI92",
            FuelType::Ai95 => "AI95",
            FuelType::Ai98 => "AI98",
            FuelType::Diesel => "DIESEL",
        }
    }

    /// Parse a label, code or alias.
    ///
    /// Case, surrounding whitespace, `-`, `_` and inner spaces are ignored,
    /// so `"АИ-95"`, `"ai 95"` and `"AI95"` all resolve to [`FuelType::Ai95`].
    pub fn from_label(s: &str) -> Option<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();

        match normalized.as_str() {
            "АИ92" | "AI92" => Some(FuelType::Ai92),
            "АИ95" | "AI95" => Some(FuelType::Ai95),
            "АИ98" | "AI98" => Some(FuelType::Ai98),
            "ДТ" | "DT" | "DIESEL" => Some(FuelType::Diesel),
            _ => None,
        }
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ==========================================
// Truck operational status
// ==========================================
// Derived from the active dispatch phase, never stored on the truck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TruckStatus {
    Idle,      // no active dispatch
    EnRoute,   // outbound or returning leg
    Unloading, // at stations
    Loading,   // reloading at the depot
}

impl TruckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TruckStatus::Idle => "IDLE",
            TruckStatus::EnRoute => "EN_ROUTE",
            TruckStatus::Unloading => "UNLOADING",
            TruckStatus::Loading => "LOADING",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, TruckStatus::Idle)
    }
}

impl fmt::Display for TruckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Route step kind
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Depot,
    Station,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Depot => write!(f, "depot"),
            StepKind::Station => write!(f, "station"),
        }
    }
}

/// Geographic coordinate `(lat, lon)`, serialized as a two-element array
pub type Coordinates = (f64, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuel_type_from_label_accepts_aliases() {
        assert_eq!(FuelType::from_label("АИ-95"), Some(FuelType::Ai95));
        assert_eq!(FuelType::from_label(" ai-95 "), Some(FuelType::Ai95));
        assert_eq!(FuelType::from_label("AI 92"), Some(FuelType::Ai92));
        assert_eq!(FuelType::from_label("ДТ"), Some(FuelType::Diesel));
        assert_eq!(FuelType::from_label("diesel"), Some(FuelType::Diesel));
        assert_eq!(FuelType::from_label("AI-100"), None);
        assert_eq!(FuelType::from_label(""), None);
    }

    #[test]
    fn test_fuel_type_serde_uses_planner_labels() {
        let json = serde_json::to_string(&FuelType::Ai98).unwrap();
        assert_eq!(json, "\"АИ-98\"");

        let parsed: FuelType = serde_json::from_str("\"AI-98\"").unwrap();
        assert_eq!(parsed, FuelType::Ai98);
    }

    #[test]
    fn test_truck_status_display() {
        assert_eq!(TruckStatus::EnRoute.to_string(), "EN_ROUTE");
        assert!(TruckStatus::Idle.is_idle());
        assert!(!TruckStatus::Loading.is_idle());
    }
}
