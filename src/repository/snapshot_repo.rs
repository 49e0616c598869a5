// ==========================================
// Fuel Dispatch - Snapshot repository
// ==========================================
// Tables: station, fuel_level, delivery_log, snapshot_meta
// A save is one transaction and replaces the stored state: stations,
// levels and ledger rows all mirror the snapshot after commit.
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::delivery_log::{DeliveryLogEntry, SkippedStep};
use crate::domain::snapshot::Snapshot;
use crate::domain::station::{FuelLevel, Station};
use crate::domain::types::FuelType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

pub struct SnapshotRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        init_schema(&*repo.get_conn()?)?;
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// Persists `snapshot` in one transaction
    pub fn save(&self, snapshot: &Snapshot) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        // Stations are rewritten wholesale
        tx.execute("DELETE FROM fuel_level", [])?;
        tx.execute("DELETE FROM station", [])?;
        for (seq, station) in snapshot.stations.iter().enumerate() {
            tx.execute(
                "INSERT INTO station (station_id, seq, name, address, lat, lon)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    station.id,
                    seq as i64,
                    station.name,
                    station.address,
                    station.coordinates.0,
                    station.coordinates.1,
                ],
            )?;
            for (level_seq, level) in station.fuel_levels.iter().enumerate() {
                tx.execute(
                    "INSERT INTO fuel_level (station_id, seq, fuel_type, current_l, min_l, max_l)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        station.id,
                        level_seq as i64,
                        level.fuel_type.code(),
                        level.current_l,
                        level.min_l,
                        level.max_l,
                    ],
                )?;
            }
        }

        // Ledger rows follow snapshot order; seq is the position
        tx.execute("DELETE FROM delivery_log", [])?;
        for (seq, entry) in snapshot.ledger.iter().enumerate() {
            tx.execute(
                "INSERT INTO delivery_log (
                    seq, log_id, logged_at, truck_id, driver, fuel_type,
                    total_volume_l, delivered_volume_l, total_cost, route_json, skipped_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    seq as i64 + 1,
                    entry.log_id,
                    entry.logged_at.to_rfc3339(),
                    entry.truck_id,
                    entry.driver,
                    entry.fuel_type.code(),
                    entry.total_volume_l,
                    entry.delivered_volume_l,
                    entry.total_cost,
                    serde_json::to_string(&entry.route)?,
                    serde_json::to_string(&entry.skipped)?,
                ],
            )?;
        }

        tx.execute(
            "INSERT INTO snapshot_meta (id, taken_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET taken_at = excluded.taken_at",
            params![snapshot.taken_at.to_rfc3339()],
        )?;

        tx.commit()?;
        debug!(
            stations = snapshot.stations.len(),
            ledger = snapshot.ledger.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Last saved snapshot; `None` if nothing was ever saved
    pub fn load(&self) -> RepositoryResult<Option<Snapshot>> {
        let conn = self.get_conn()?;

        let taken_at: Option<String> = conn
            .query_row("SELECT taken_at FROM snapshot_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(taken_at) = taken_at else {
            return Ok(None);
        };

        let stations = load_stations(&conn)?;
        let ledger = load_ledger(&conn)?;

        Ok(Some(Snapshot {
            stations,
            ledger,
            taken_at: parse_timestamp("taken_at", &taken_at)?,
        }))
    }

    pub fn ledger_len(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM delivery_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ==========================================
// Row decoding
// ==========================================

fn load_stations(conn: &Connection) -> RepositoryResult<Vec<Station>> {
    let mut levels: HashMap<String, Vec<FuelLevel>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT station_id, fuel_type, current_l, min_l, max_l
             FROM fuel_level ORDER BY station_id, seq",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
            ))
        })?;
        for row in rows {
            let (station_id, fuel, current, min, max) = row?;
            let fuel_type = parse_fuel("fuel_level.fuel_type", &fuel)?;
            levels
                .entry(station_id)
                .or_default()
                .push(FuelLevel::new(fuel_type, current, min, max));
        }
    }

    let mut stmt =
        conn.prepare("SELECT station_id, name, address, lat, lon FROM station ORDER BY seq")?;
    let rows = stmt.query_map([], |row| {
        Ok(Station {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            coordinates: (row.get(3)?, row.get(4)?),
            fuel_levels: Vec::new(),
        })
    })?;

    let mut stations = Vec::new();
    for row in rows {
        let mut station = row?;
        station.fuel_levels = levels.remove(&station.id).unwrap_or_default();
        stations.push(station);
    }
    Ok(stations)
}

fn load_ledger(conn: &Connection) -> RepositoryResult<Vec<DeliveryLogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT log_id, logged_at, truck_id, driver, fuel_type,
                total_volume_l, delivered_volume_l, total_cost, route_json, skipped_json
         FROM delivery_log ORDER BY seq",
    )?;

    struct Row {
        log_id: String,
        logged_at: String,
        truck_id: String,
        driver: String,
        fuel_type: String,
        total_volume_l: f64,
        delivered_volume_l: f64,
        total_cost: f64,
        route_json: String,
        skipped_json: String,
    }

    let rows = stmt.query_map([], |row| {
        Ok(Row {
            log_id: row.get(0)?,
            logged_at: row.get(1)?,
            truck_id: row.get(2)?,
            driver: row.get(3)?,
            fuel_type: row.get(4)?,
            total_volume_l: row.get(5)?,
            delivered_volume_l: row.get(6)?,
            total_cost: row.get(7)?,
            route_json: row.get(8)?,
            skipped_json: row.get(9)?,
        })
    })?;

    let mut entries = Vec::new();
    for row in rows {
        let row = row?;
        let route: Vec<String> = serde_json::from_str(&row.route_json)?;
        let skipped: Vec<SkippedStep> = serde_json::from_str(&row.skipped_json)?;
        entries.push(DeliveryLogEntry {
            logged_at: parse_timestamp("delivery_log.logged_at", &row.logged_at)?,
            fuel_type: parse_fuel("delivery_log.fuel_type", &row.fuel_type)?,
            log_id: row.log_id,
            truck_id: row.truck_id,
            driver: row.driver,
            total_volume_l: row.total_volume_l,
            delivered_volume_l: row.delivered_volume_l,
            total_cost: row.total_cost,
            route,
            skipped,
        });
    }
    Ok(entries)
}

pub(crate) fn parse_fuel(field: &str, raw: &str) -> RepositoryResult<FuelType> {
    FuelType::from_label(raw).ok_or_else(|| RepositoryError::FieldValueError {
        field: field.to_string(),
        message: format!("unknown fuel type {}", raw),
    })
}

fn parse_timestamp(field: &str, raw: &str) -> RepositoryResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::FieldValueError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn repo() -> SnapshotRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        SnapshotRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    fn entry(id: &str, at: DateTime<Utc>) -> DeliveryLogEntry {
        DeliveryLogEntry {
            log_id: id.to_string(),
            logged_at: at,
            truck_id: "t001".to_string(),
            driver: "Иванов И.И.".to_string(),
            fuel_type: FuelType::Ai95,
            total_volume_l: 15000.0,
            delivered_volume_l: 14000.0,
            total_cost: 99.5,
            route: vec!["АЗС №15".to_string(), "АЗС №7".to_string()],
            skipped: vec![SkippedStep::new("АЗС №99", "unknown station: АЗС №99")],
        }
    }

    #[test]
    fn test_load_empty_returns_none() {
        assert!(repo().load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_preserves_order() {
        let repo = repo();
        let station_b = Station::new("s002", "АЗС №7", "пр. Победы", (54.30, 29.12))
            .with_level(FuelLevel::new(FuelType::Diesel, 100.0, 50.0, 200.0))
            .with_level(FuelLevel::new(FuelType::Ai92, 10.0, 50.0, 200.0));
        let station_a = Station::new("s001", "АЗС №15", "ул. Московская", (54.32, 29.15))
            .with_level(FuelLevel::new(FuelType::Ai95, 8000.0, 10000.0, 40000.0));

        let now = Utc::now();
        let snapshot = Snapshot::new(
            vec![station_b, station_a],
            vec![entry("b", now), entry("a", now + Duration::seconds(1))],
        );
        repo.save(&snapshot).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        assert_eq!(loaded.stations, snapshot.stations);
        assert_eq!(loaded.ledger.len(), 2);
        assert_eq!(loaded.ledger[0].log_id, "b");
        assert_eq!(loaded.ledger[1].skipped, snapshot.ledger[1].skipped);
        assert_eq!(loaded.ledger[0].route, snapshot.ledger[0].route);
    }

    #[test]
    fn test_save_grows_ledger_without_duplicates() {
        let repo = repo();
        let now = Utc::now();
        let first = Snapshot::new(vec![], vec![entry("a", now)]);
        repo.save(&first).unwrap();
        let second = Snapshot::new(vec![], vec![entry("a", now), entry("b", now)]);
        repo.save(&second).unwrap();
        assert_eq!(repo.ledger_len().unwrap(), 2);
    }

    #[test]
    fn test_save_replaces_ledger() {
        let repo = repo();
        let now = Utc::now();
        repo.save(&Snapshot::new(vec![], vec![entry("a", now)]))
            .unwrap();

        // Shorter ledger, e.g. after a restore
        repo.save(&Snapshot::new(vec![], vec![])).unwrap();
        assert!(repo.load().unwrap().unwrap().ledger.is_empty());

        // Different ledger with an older entry
        repo.save(&Snapshot::new(vec![], vec![entry("b", now)]))
            .unwrap();
        let older = Snapshot::new(vec![], vec![entry("a", now - Duration::seconds(5))]);
        repo.save(&older).unwrap();

        let loaded = repo.load().unwrap().unwrap();
        let ids: Vec<_> = loaded.ledger.iter().map(|e| e.log_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
        assert!(loaded.validate().is_ok());
    }
}
