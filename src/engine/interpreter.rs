// ==========================================
// Fuel Dispatch - Route plan interpreter
// ==========================================
// Turns a planner RoutePlan into unload instructions and a ledger
// draft. Pure: never touches inventory or ledger.
//
// Unload action contract:
//   <verb> <volume><unit> <fuel label>
//   verb  = Unload | Разгрузить (any case)
//   volume = digits, optionally grouped by spaces
//   unit  = L | l | л
// e.g. "Unload 15000L AI-95", "Разгрузить 15 000л АИ-95"
// Anything else on a station step is informational. An unload whose
// fuel label is unknown is skipped and kept in the skipped list.
// ==========================================

use crate::domain::delivery_log::{DeliveryDraft, SkippedStep};
use crate::domain::route_plan::RoutePlan;
use crate::domain::truck::Truck;
use crate::domain::types::{FuelType, StepKind};
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::inventory::PlannedDelivery;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

fn unload_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:unload|разгрузить)\s+([0-9][0-9\s]*?)\s*(?:l|л)\s+(.+?)\s*$")
            .expect("unload pattern is a valid regex")
    })
}

/// Volume and raw fuel label extracted from an unload action
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedUnload {
    pub volume_l: f64,
    pub fuel_label: String,
}

/// One validated unload step, not yet bound to a station id
#[derive(Debug, Clone, PartialEq)]
pub struct UnloadInstruction {
    pub step_index: usize,
    pub station_name: String,
    pub fuel_type: FuelType,
    pub volume_l: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedPlan {
    pub unloads: Vec<UnloadInstruction>,
    pub draft: DeliveryDraft,
    /// Steps dropped while interpreting (unknown fuel label)
    pub skipped: Vec<SkippedStep>,
}

impl InterpretedPlan {
    pub fn planned_volume_l(&self) -> f64 {
        self.unloads.iter().map(|u| u.volume_l).sum()
    }
}

/// Unloads bound to station ids, plus the ones that could not be bound
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDeliveries {
    pub deliveries: Vec<PlannedDelivery>,
    pub skipped: Vec<SkippedStep>,
}

pub struct RoutePlanInterpreter;

impl RoutePlanInterpreter {
    pub fn parse_unload(action: &str) -> Option<ParsedUnload> {
        let caps = unload_pattern().captures(action)?;
        let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
        let volume_l = digits.parse::<f64>().ok()?;
        Some(ParsedUnload {
            volume_l,
            fuel_label: caps[2].to_string(),
        })
    }

    /// Validates `plan` against `truck` and extracts its unload steps
    pub fn interpret(truck: &Truck, plan: &RoutePlan) -> DispatchResult<InterpretedPlan> {
        let reject = |reason: String| DispatchError::invalid_plan(&truck.id, reason);

        // ===== Shape =====
        match (plan.route.first(), plan.route.last()) {
            (Some(first), Some(last))
                if first.kind == StepKind::Depot && last.kind == StepKind::Depot => {}
            (None, _) | (_, None) => return Err(reject("route is empty".to_string())),
            _ => return Err(reject("route must start and end at the depot".to_string())),
        }

        // ===== Truck match =====
        if plan.truck_id != truck.id {
            return Err(reject(format!("plan is for truck {}", plan.truck_id)));
        }
        if plan.fuel_type != truck.fuel_type {
            return Err(reject(format!(
                "plan carries {}, truck carries {}",
                plan.fuel_type, truck.fuel_type
            )));
        }

        // ===== Volume =====
        let total = plan.total_volume_loaded_l;
        if !total.is_finite() || total < 0.0 {
            return Err(reject(format!("total volume {} is not a valid volume", total)));
        }
        if total > truck.capacity_l {
            return Err(reject(format!(
                "total volume {} exceeds capacity {}",
                total, truck.capacity_l
            )));
        }

        // ===== Steps =====
        let mut unloads = Vec::new();
        let mut visited = Vec::new();
        let mut skipped = Vec::new();
        for (index, step) in plan.route.iter().enumerate() {
            if step.kind != StepKind::Station {
                continue;
            }
            visited.push(step.name.clone());

            let Some(parsed) = Self::parse_unload(&step.action) else {
                debug!(step = index, action = %step.action, "informational station step");
                continue;
            };

            let Some(fuel_type) = FuelType::from_label(&parsed.fuel_label) else {
                warn!(
                    truck_id = %truck.id,
                    step = index,
                    fuel_label = %parsed.fuel_label,
                    "unload step names an unknown fuel, skipped"
                );
                skipped.push(SkippedStep::new(
                    &step.name,
                    format!("unknown fuel type: {}", parsed.fuel_label),
                ));
                continue;
            };
            if fuel_type != plan.fuel_type {
                return Err(reject(format!(
                    "step {} unloads {} from a {} truck",
                    index, fuel_type, plan.fuel_type
                )));
            }

            unloads.push(UnloadInstruction {
                step_index: index,
                station_name: step.name.clone(),
                fuel_type,
                volume_l: parsed.volume_l,
            });
        }

        let planned: f64 = unloads.iter().map(|u| u.volume_l).sum();
        if planned > total {
            return Err(reject(format!(
                "unload steps total {} but only {} is loaded",
                planned, total
            )));
        }

        Ok(InterpretedPlan {
            unloads,
            draft: DeliveryDraft {
                truck_id: truck.id.clone(),
                driver: plan.driver.clone(),
                fuel_type: plan.fuel_type,
                total_volume_l: total,
                total_cost: plan.estimated_cost,
                route: visited,
            },
            skipped,
        })
    }

    /// Binds unload steps to station ids; unknown names are skipped
    pub fn resolve(
        plan: &InterpretedPlan,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ResolvedDeliveries {
        let mut resolved = ResolvedDeliveries {
            deliveries: Vec::new(),
            skipped: plan.skipped.clone(),
        };
        for unload in &plan.unloads {
            match lookup(&unload.station_name) {
                Some(station_id) => resolved.deliveries.push(PlannedDelivery {
                    station_id,
                    station_name: unload.station_name.clone(),
                    fuel_type: unload.fuel_type,
                    volume_l: unload.volume_l,
                }),
                None => {
                    let err = DispatchError::UnknownStation(unload.station_name.clone());
                    warn!(
                        truck_id = %plan.draft.truck_id,
                        step = unload.step_index,
                        error = %err,
                        "unload step skipped"
                    );
                    resolved
                        .skipped
                        .push(SkippedStep::new(&unload.station_name, err.to_string()));
                }
            }
        }
        resolved
    }
}
