// ==========================================
// Fuel Dispatch - Passive consumption process
// ==========================================
// Every `period`, subtract `step` liters from every tank of every
// station (floored at 0), independently of dispatch activity.
// ==========================================

use crate::engine::events::{emit, DispatchEvent, DispatchEventPublisher};
use crate::engine::inventory::StationInventory;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionSettings {
    pub period: Duration,
    pub step_l: f64,
}

impl Default for ConsumptionSettings {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(10_000),
            step_l: 500.0,
        }
    }
}

pub struct ConsumptionProcess {
    inventory: Arc<StationInventory>,
    publisher: Arc<dyn DispatchEventPublisher>,
    settings: ConsumptionSettings,
    ticks: u64,
}

impl ConsumptionProcess {
    pub fn new(
        inventory: Arc<StationInventory>,
        publisher: Arc<dyn DispatchEventPublisher>,
        settings: ConsumptionSettings,
    ) -> Self {
        Self {
            inventory,
            publisher,
            settings,
            ticks: 0,
        }
    }

    /// Applies one consumption step; returns the number of tanks that changed
    pub fn tick(&mut self) -> usize {
        self.ticks += 1;
        let changed = self.inventory.apply_consumption(self.settings.step_l);
        debug!(tick = self.ticks, step_l = self.settings.step_l, changed, "consumption tick");
        emit(
            self.publisher.as_ref(),
            DispatchEvent::ConsumptionTick {
                tick: self.ticks,
                step_l: self.settings.step_l,
                tanks_changed: changed,
            },
        );
        changed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Starts the process on the current tokio runtime.
    ///
    /// The first tick fires one period after the call.
    pub fn spawn(mut self) -> ConsumptionHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.settings.period.max(Duration::from_millis(1));

        let join = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                period_ms = period.as_millis() as u64,
                step_l = self.settings.step_l,
                "consumption process started"
            );
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!(ticks = self.ticks, "consumption process stopped");
            self.ticks
        });

        ConsumptionHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}

/// Stop-and-join handle for a spawned consumption process
pub struct ConsumptionHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<u64>,
}

impl ConsumptionHandle {
    /// Signals shutdown and waits; returns the number of ticks applied
    pub async fn shutdown(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.join.await {
            Ok(ticks) => ticks,
            Err(e) => {
                warn!(error = %e, "consumption task ended abnormally");
                0
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
