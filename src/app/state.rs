// ==========================================
// Fuel Dispatch - Application state
// ==========================================
// Wires database, configuration, engine and API instances together.
// Startup restores the fleet and the last snapshot; a corrupt
// snapshot aborts construction.
// ==========================================

use std::sync::{Arc, Mutex, PoisonError};

use rusqlite::Connection;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::api::{ApiResult, ConfigApi, DispatchApi, FleetApi, StationApi};
use crate::app::seed::{demo_stations, demo_trucks};
use crate::config::{ConfigManager, DispatchConfig, DispatchConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::{
    BroadcastPublisher, ConsumptionHandle, DispatchEvent, DispatchEventPublisher,
    DispatchOrchestrator, HttpRoutePlanner, RoutePlanner, SequentialRoutePlanner,
};
use crate::repository::{FleetRepository, SnapshotRepository};

/// Consumption ticker plus the snapshot persister
struct BackgroundTasks {
    consumption: ConsumptionHandle,
    persister: JoinHandle<()>,
}

pub struct AppState {
    /// Database path
    pub db_path: String,

    /// Configuration resolved at startup
    pub config: DispatchConfig,

    pub orchestrator: Arc<DispatchOrchestrator>,

    pub fleet_api: Arc<FleetApi>,
    pub station_api: Arc<StationApi>,
    pub dispatch_api: Arc<DispatchApi>,
    pub config_api: Arc<ConfigApi>,

    pub snapshot_repo: Arc<SnapshotRepository>,

    /// Engine event bus; observers call `subscribe()`
    pub event_publisher: Arc<BroadcastPublisher>,

    background: Mutex<Option<BackgroundTasks>>,
}

impl AppState {
    /// Opens `db_path` and reads configuration from its config_kv table
    pub async fn new(db_path: String) -> Result<Self, String> {
        let conn = Self::open_database(&db_path)?;
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_dispatch_config()
            .await
            .map_err(|e| format!("cannot load configuration: {}", e))?;

        Self::build(db_path, conn, config_manager, config)
    }

    /// Same as [`AppState::new`] with configuration from `reader`
    pub async fn with_config_reader(
        db_path: String,
        reader: &dyn DispatchConfigReader,
    ) -> Result<Self, String> {
        let conn = Self::open_database(&db_path)?;
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("cannot create ConfigManager: {}", e))?,
        );
        let config = reader
            .load_dispatch_config()
            .await
            .map_err(|e| format!("cannot load configuration: {}", e))?;

        Self::build(db_path, conn, config_manager, config)
    }

    fn open_database(db_path: &str) -> Result<Arc<Mutex<Connection>>, String> {
        tracing::info!(db_path, "opening database");
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| format!("cannot open database: {}", e))?;
        init_schema(&conn).map_err(|e| format!("cannot initialise schema: {}", e))?;
        Ok(Arc::new(Mutex::new(conn)))
    }

    fn build(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        config: DispatchConfig,
    ) -> Result<Self, String> {
        // ==========================================
        // Repositories
        // ==========================================
        let fleet_repo = Arc::new(
            FleetRepository::from_connection(conn.clone())
                .map_err(|e| format!("cannot create FleetRepository: {}", e))?,
        );
        let snapshot_repo = Arc::new(
            SnapshotRepository::from_connection(conn)
                .map_err(|e| format!("cannot create SnapshotRepository: {}", e))?,
        );

        // ==========================================
        // Engine
        // ==========================================
        let event_publisher = Arc::new(BroadcastPublisher::default());
        let publisher: Arc<dyn DispatchEventPublisher> = event_publisher.clone();
        let orchestrator = Arc::new(
            DispatchOrchestrator::new(config.timings, publisher)
                .with_prices(config.fuel_prices.clone()),
        );

        let trucks = fleet_repo
            .list()
            .map_err(|e| format!("cannot load fleet: {}", e))?;
        let truck_count = trucks.len();
        for truck in trucks {
            orchestrator
                .register_truck(truck)
                .map_err(|e| format!("stored fleet rejected: {}", e))?;
        }

        let snapshot = snapshot_repo
            .load()
            .map_err(|e| format!("cannot load snapshot: {}", e))?;
        if let Some(snapshot) = snapshot {
            orchestrator
                .restore(snapshot)
                .map_err(|e| format!("cannot restore snapshot: {}", e))?;
        }

        let planner: Arc<dyn RoutePlanner> = match &config.planner_endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "using HTTP route planner");
                Arc::new(
                    HttpRoutePlanner::new(endpoint, config.planner_timeout)
                        .map_err(|e| e.to_string())?,
                )
            }
            None => {
                tracing::info!("no planner endpoint configured, using sequential planner");
                Arc::new(SequentialRoutePlanner)
            }
        };

        // ==========================================
        // API
        // ==========================================
        let fleet_api = Arc::new(FleetApi::new(orchestrator.clone(), fleet_repo));
        let station_api = Arc::new(StationApi::new(orchestrator.clone(), snapshot_repo.clone()));
        let dispatch_api = Arc::new(DispatchApi::new(orchestrator.clone(), planner));
        let config_api = Arc::new(ConfigApi::new(config_manager, orchestrator.clone()));

        tracing::info!(
            trucks = truck_count,
            stations = orchestrator.station_inventory().len(),
            ledger = orchestrator.ledger().len(),
            "AppState ready"
        );

        Ok(Self {
            db_path,
            config,
            orchestrator,
            fleet_api,
            station_api,
            dispatch_api,
            config_api,
            snapshot_repo,
            event_publisher,
            background: Mutex::new(None),
        })
    }

    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// Registers the demo fleet and stations when both are empty
    pub fn seed_demo_data(&self) -> ApiResult<bool> {
        if !self.fleet_api.list_trucks().is_empty() || !self.station_api.list_stations().is_empty() {
            return Ok(false);
        }
        for truck in demo_trucks() {
            self.fleet_api.register_truck(truck)?;
        }
        for station in demo_stations() {
            self.orchestrator.register_station(station)?;
        }
        self.station_api.persist()?;
        tracing::info!("demo data seeded");
        Ok(true)
    }

    // ==========================================
    // Background tasks
    // ==========================================

    /// Starts consumption and the snapshot persister (no-op if running).
    /// Must be called inside a tokio runtime.
    pub fn start_background(&self) {
        let mut background = self.background.lock().unwrap_or_else(PoisonError::into_inner);
        if background.is_some() {
            return;
        }

        let persister = spawn_persister(
            self.orchestrator.clone(),
            self.snapshot_repo.clone(),
            self.event_publisher.subscribe(),
        );
        let consumption = self.orchestrator.start_consumption(self.config.consumption);
        *background = Some(BackgroundTasks {
            consumption,
            persister,
        });
        tracing::info!(
            period_ms = self.config.consumption.period.as_millis() as u64,
            step_l = self.config.consumption.step_l,
            "background tasks started"
        );
    }

    /// Saves the current snapshot
    pub fn persist_now(&self) -> ApiResult<()> {
        self.station_api.persist()
    }

    /// Stops consumption, waits for in-flight dispatches and saves a final snapshot
    pub async fn shutdown(&self) -> ApiResult<()> {
        let background = self.background.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some(tasks) = &background {
            tasks.persister.abort();
        }
        if let Some(tasks) = background {
            let ticks = tasks.consumption.shutdown().await;
            tracing::info!(ticks, "consumption stopped");
        }

        let reports = self.dispatch_api.wait_all().await;
        if !reports.is_empty() {
            tracing::info!(dispatches = reports.len(), "in-flight dispatches finished");
        }
        self.persist_now()
    }
}

// ==========================================
// Snapshot persister
// ==========================================
fn spawn_persister(
    orchestrator: Arc<DispatchOrchestrator>,
    snapshot_repo: Arc<SnapshotRepository>,
    mut events: broadcast::Receiver<DispatchEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) if event.changes_inventory() => {
                    save_snapshot(&orchestrator, &snapshot_repo, event.as_str());
                }
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "persister lagged behind the event bus");
                    save_snapshot(&orchestrator, &snapshot_repo, "Lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn save_snapshot(
    orchestrator: &DispatchOrchestrator,
    snapshot_repo: &SnapshotRepository,
    trigger: &str,
) {
    let snapshot = orchestrator.snapshot();
    match snapshot_repo.save(&snapshot) {
        Ok(()) => tracing::debug!(
            trigger,
            stations = snapshot.stations.len(),
            ledger = snapshot.ledger.len(),
            "snapshot saved"
        ),
        Err(e) => tracing::error!(trigger, error = %e, "snapshot save failed"),
    }
}

// ==========================================
// Default database path
// ==========================================

/// `FUEL_DISPATCH_DB_PATH` when set, else `{data_dir}/fuel-dispatch/fuel_dispatch.db`
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("FUEL_DISPATCH_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./fuel_dispatch.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("fuel-dispatch");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("fuel_dispatch.db");
        }
    }
    path.to_string_lossy().to_string()
}
