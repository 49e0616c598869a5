// ==========================================
// Fuel Dispatch - Dispatch state machine
// ==========================================
// Lifecycle of one accepted dispatch:
//
//   Idle -> Outbound -> Unloading -> Returning -> Loading -> Idle
//
// Outbound/Returning report EnRoute. The delivery (inventory + ledger)
// happens when the unload timer elapses, as one unit.
// Truck status is read from the DispatchBoard; no entry means Idle.
// ==========================================

use crate::domain::delivery_log::{DeliveryLogEntry, SkippedStep};
use crate::domain::truck::Truck;
use crate::domain::types::TruckStatus;
use crate::engine::error::{DispatchError, DispatchResult};
use crate::engine::events::{emit, DispatchEvent, DispatchEventPublisher};
use crate::engine::guard;
use crate::engine::interpreter::{InterpretedPlan, RoutePlanInterpreter};
use crate::engine::inventory::{DeliveryOutcome, StationInventory};
use crate::engine::ledger::DeliveryLedger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

// ==========================================
// Phase timings
// ==========================================

/// Simulation durations for each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub outbound: Duration,
    pub unload: Duration,
    pub return_transit: Duration,
    pub reload: Duration,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            outbound: Duration::from_millis(5_000),
            unload: Duration::from_millis(3_000),
            return_transit: Duration::from_millis(5_000),
            reload: Duration::from_millis(3_000),
        }
    }
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.outbound + self.unload + self.return_transit + self.reload
    }
}

// ==========================================
// DispatchPhase
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchPhase {
    Outbound,  // depot -> stations
    Unloading, // at stations
    Returning, // stations -> depot
    Loading,   // reloading at depot
}

impl DispatchPhase {
    pub fn truck_status(&self) -> TruckStatus {
        match self {
            DispatchPhase::Outbound | DispatchPhase::Returning => TruckStatus::EnRoute,
            DispatchPhase::Unloading => TruckStatus::Unloading,
            DispatchPhase::Loading => TruckStatus::Loading,
        }
    }

    /// `None` after Loading: the truck goes back to Idle
    pub fn next(&self) -> Option<DispatchPhase> {
        match self {
            DispatchPhase::Outbound => Some(DispatchPhase::Unloading),
            DispatchPhase::Unloading => Some(DispatchPhase::Returning),
            DispatchPhase::Returning => Some(DispatchPhase::Loading),
            DispatchPhase::Loading => None,
        }
    }

    pub fn duration(&self, timings: &PhaseTimings) -> Duration {
        match self {
            DispatchPhase::Outbound => timings.outbound,
            DispatchPhase::Unloading => timings.unload,
            DispatchPhase::Returning => timings.return_transit,
            DispatchPhase::Loading => timings.reload,
        }
    }
}

// ==========================================
// ActiveDispatch - in-flight table row
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveDispatch {
    pub dispatch_id: String,
    pub truck_id: String,
    pub phase: DispatchPhase,
    pub accepted_at: DateTime<Utc>,
    pub phase_started_at: DateTime<Utc>,
}

impl ActiveDispatch {
    pub fn status(&self) -> TruckStatus {
        self.phase.truck_status()
    }
}

// ==========================================
// DispatchBoard - the in-flight table
// ==========================================
// The only structure shared across trucks. Touched on accept, phase
// change and release.
#[derive(Debug, Default)]
pub struct DispatchBoard {
    active: Mutex<HashMap<String, ActiveDispatch>>,
}

impl DispatchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept-or-reject under one lock hold.
    ///
    /// A busy truck is rejected before `validate` runs. The board entry is
    /// inserted only when `validate` succeeds.
    pub fn claim<T>(
        &self,
        truck_id: &str,
        validate: impl FnOnce() -> DispatchResult<T>,
    ) -> DispatchResult<(ActiveDispatch, T)> {
        let mut active = guard::lock(&self.active);
        if let Some(current) = active.get(truck_id) {
            return Err(DispatchError::TruckBusy {
                truck_id: truck_id.to_string(),
                status: current.status(),
            });
        }

        let validated = validate()?;

        let now = Utc::now();
        let dispatch = ActiveDispatch {
            dispatch_id: Uuid::new_v4().to_string(),
            truck_id: truck_id.to_string(),
            phase: DispatchPhase::Outbound,
            accepted_at: now,
            phase_started_at: now,
        };
        active.insert(truck_id.to_string(), dispatch.clone());
        Ok((dispatch, validated))
    }

    /// Runs `f` only if the truck has no active dispatch, with the board locked
    pub fn while_idle<R>(
        &self,
        truck_id: &str,
        f: impl FnOnce() -> DispatchResult<R>,
    ) -> DispatchResult<R> {
        let active = guard::lock(&self.active);
        if let Some(current) = active.get(truck_id) {
            return Err(DispatchError::TruckBusy {
                truck_id: truck_id.to_string(),
                status: current.status(),
            });
        }
        f()
    }

    /// Runs `f` only when nothing is in flight, with the board locked
    pub fn while_quiet<R>(&self, f: impl FnOnce() -> DispatchResult<R>) -> DispatchResult<R> {
        let active = guard::lock(&self.active);
        if !active.is_empty() {
            return Err(DispatchError::DispatchesInFlight(active.len()));
        }
        f()
    }

    pub(crate) fn advance(&self, truck_id: &str, phase: DispatchPhase) {
        if let Some(dispatch) = guard::lock(&self.active).get_mut(truck_id) {
            dispatch.phase = phase;
            dispatch.phase_started_at = Utc::now();
        }
    }

    pub(crate) fn release(&self, truck_id: &str) -> Option<ActiveDispatch> {
        guard::lock(&self.active).remove(truck_id)
    }

    pub fn status(&self, truck_id: &str) -> TruckStatus {
        guard::lock(&self.active)
            .get(truck_id)
            .map(|d| d.status())
            .unwrap_or(TruckStatus::Idle)
    }

    pub fn get(&self, truck_id: &str) -> Option<ActiveDispatch> {
        guard::lock(&self.active).get(truck_id).cloned()
    }

    pub fn active(&self) -> Vec<ActiveDispatch> {
        let mut list: Vec<ActiveDispatch> = guard::lock(&self.active).values().cloned().collect();
        list.sort_by(|a, b| a.accepted_at.cmp(&b.accepted_at));
        list
    }

    pub fn len(&self) -> usize {
        guard::lock(&self.active).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// DispatchReport - what a finished dispatch did
// ==========================================
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub dispatch_id: String,
    pub truck_id: String,
    pub entry: Option<DeliveryLogEntry>,
    pub outcomes: Vec<DeliveryOutcome>,
    pub skipped: Vec<SkippedStep>,
}

impl DispatchReport {
    pub fn delivered_l(&self) -> f64 {
        self.outcomes.iter().map(|o| o.accepted_l).sum()
    }

    pub fn spilled_l(&self) -> f64 {
        self.outcomes.iter().map(|o| o.spilled_l).sum()
    }
}

// ==========================================
// DispatchStateMachine - one truck, one trip
// ==========================================
pub struct DispatchStateMachine {
    dispatch_id: String,
    truck: Truck,
    plan: InterpretedPlan,
    phase: DispatchPhase,
    timings: PhaseTimings,

    inventory: Arc<StationInventory>,
    ledger: Arc<DeliveryLedger>,
    board: Arc<DispatchBoard>,
    publisher: Arc<dyn DispatchEventPublisher>,

    report: DispatchReport,
}

impl DispatchStateMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dispatch: &ActiveDispatch,
        truck: Truck,
        plan: InterpretedPlan,
        timings: PhaseTimings,
        inventory: Arc<StationInventory>,
        ledger: Arc<DeliveryLedger>,
        board: Arc<DispatchBoard>,
        publisher: Arc<dyn DispatchEventPublisher>,
    ) -> Self {
        Self {
            dispatch_id: dispatch.dispatch_id.clone(),
            report: DispatchReport {
                dispatch_id: dispatch.dispatch_id.clone(),
                truck_id: truck.id.clone(),
                entry: None,
                outcomes: Vec::new(),
                skipped: Vec::new(),
            },
            truck,
            plan,
            phase: dispatch.phase,
            timings,
            inventory,
            ledger,
            board,
            publisher,
        }
    }

    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    /// Advances past the current phase.
    ///
    /// Returns the new phase, or `None` once the truck has been released.
    pub fn on_timer_elapsed(&mut self) -> Option<DispatchPhase> {
        if self.phase == DispatchPhase::Unloading {
            self.complete_unload();
        }

        match self.phase.next() {
            Some(next) => {
                self.phase = next;
                self.board.advance(&self.truck.id, next);
                debug!(
                    dispatch_id = %self.dispatch_id,
                    truck_id = %self.truck.id,
                    phase = ?next,
                    "phase changed"
                );
                emit(
                    self.publisher.as_ref(),
                    DispatchEvent::PhaseChanged {
                        dispatch_id: self.dispatch_id.clone(),
                        truck_id: self.truck.id.clone(),
                        status: next.truck_status(),
                    },
                );
                Some(next)
            }
            None => {
                self.board.release(&self.truck.id);
                info!(dispatch_id = %self.dispatch_id, truck_id = %self.truck.id, "truck released");
                emit(
                    self.publisher.as_ref(),
                    DispatchEvent::Released {
                        dispatch_id: self.dispatch_id.clone(),
                        truck_id: self.truck.id.clone(),
                    },
                );
                None
            }
        }
    }

    /// Drives every phase on tokio timers until the truck is idle again
    pub async fn run(mut self) -> DispatchReport {
        loop {
            tokio::time::sleep(self.phase.duration(&self.timings)).await;
            if self.on_timer_elapsed().is_none() {
                break;
            }
        }
        self.report
    }

    pub fn into_report(self) -> DispatchReport {
        self.report
    }

    fn complete_unload(&mut self) {
        let inventory = Arc::clone(&self.inventory);
        let resolved = RoutePlanInterpreter::resolve(&self.plan, |name| inventory.resolve_name(name));

        let ledger = &self.ledger;
        let draft = self.plan.draft.clone();
        let unresolved = resolved.skipped.clone();

        let batch = self
            .inventory
            .apply_batch(&resolved.deliveries, |outcomes, batch_skipped| {
                let delivered: f64 = outcomes.iter().map(|o| o.accepted_l).sum();
                let mut skipped = unresolved;
                skipped.extend_from_slice(batch_skipped);
                ledger.record(draft, delivered, skipped)
            });

        let entry = batch.committed;
        let spilled: f64 = batch.outcomes.iter().map(|o| o.spilled_l).sum();

        for step in &entry.skipped {
            emit(
                self.publisher.as_ref(),
                DispatchEvent::StepSkipped {
                    dispatch_id: self.dispatch_id.clone(),
                    station_name: step.station_name.clone(),
                    reason: step.reason.clone(),
                },
            );
        }
        emit(
            self.publisher.as_ref(),
            DispatchEvent::DeliveryCompleted {
                dispatch_id: self.dispatch_id.clone(),
                truck_id: self.truck.id.clone(),
                log_id: entry.log_id.clone(),
                delivered_l: entry.delivered_volume_l,
                spilled_l: spilled,
            },
        );

        self.report.skipped = entry.skipped.clone();
        self.report.outcomes = batch.outcomes;
        self.report.entry = Some(entry);
    }
}
