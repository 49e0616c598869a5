// ==========================================
// Fuel Dispatch - Engine event publishing
// ==========================================
// Engine defines the event trait; observers (status views, the
// snapshot persister) subscribe without the engine knowing them.
// ==========================================

use crate::domain::types::{FuelType, TruckStatus};
use serde::{Deserialize, Serialize};
use std::error::Error;
use tokio::sync::broadcast;

// ==========================================
// Dispatch events
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Dispatch accepted, truck leaves the depot
    Accepted {
        dispatch_id: String,
        truck_id: String,
        fuel_type: FuelType,
        volume_l: f64,
    },
    /// Truck status changed with the phase
    PhaseChanged {
        dispatch_id: String,
        truck_id: String,
        status: TruckStatus,
    },
    /// Unload finished: inventory updated and ledger entry appended
    DeliveryCompleted {
        dispatch_id: String,
        truck_id: String,
        log_id: String,
        delivered_l: f64,
        spilled_l: f64,
    },
    /// An unload step could not be applied
    StepSkipped {
        dispatch_id: String,
        station_name: String,
        reason: String,
    },
    /// Truck is idle again
    Released { dispatch_id: String, truck_id: String },
    /// One consumption tick applied
    ConsumptionTick { tick: u64, step_l: f64, tanks_changed: usize },
}

impl DispatchEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchEvent::Accepted { .. } => "Accepted",
            DispatchEvent::PhaseChanged { .. } => "PhaseChanged",
            DispatchEvent::DeliveryCompleted { .. } => "DeliveryCompleted",
            DispatchEvent::StepSkipped { .. } => "StepSkipped",
            DispatchEvent::Released { .. } => "Released",
            DispatchEvent::ConsumptionTick { .. } => "ConsumptionTick",
        }
    }

    /// Events after which persisted state is out of date
    pub fn changes_inventory(&self) -> bool {
        matches!(
            self,
            DispatchEvent::DeliveryCompleted { .. } | DispatchEvent::ConsumptionTick { .. }
        )
    }
}

// ==========================================
// Publisher trait
// ==========================================

pub trait DispatchEventPublisher: Send + Sync {
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Publisher for callers that do not observe events (unit tests, one-shot CLI commands)
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl DispatchEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        tracing::trace!(event = event.as_str(), "NoOpEventPublisher: event dropped");
        Ok(())
    }
}

// ==========================================
// BroadcastPublisher - tokio broadcast fan-out
// ==========================================

pub struct BroadcastPublisher {
    sender: broadcast::Sender<DispatchEvent>,
}

impl BroadcastPublisher {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl DispatchEventPublisher for BroadcastPublisher {
    fn publish(&self, event: DispatchEvent) -> Result<(), Box<dyn Error + Send + Sync>> {
        // No subscriber is not a failure
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender.send(event)?;
        Ok(())
    }
}

/// Publishes and logs failures; publishing never fails an engine operation
pub(crate) fn emit(publisher: &dyn DispatchEventPublisher, event: DispatchEvent) {
    let kind = event.as_str();
    if let Err(e) = publisher.publish(event) {
        tracing::warn!(event = kind, error = %e, "event publish failed");
    }
}
