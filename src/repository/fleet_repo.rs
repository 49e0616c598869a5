// ==========================================
// Fuel Dispatch - Fleet repository
// ==========================================
// Table: truck. Rows are upserted, never deleted (retired flag only).
// ==========================================

use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::truck::Truck;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::snapshot_repo::parse_fuel;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct FleetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl FleetRepository {
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

    pub fn upsert(&self, truck: &Truck) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_row(&conn, truck)?;
        Ok(())
    }

    /// Upserts every truck in one transaction
    pub fn upsert_all(&self, trucks: &[Truck]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for truck in trucks {
            upsert_row(&tx, truck)?;
        }
        tx.commit()?;
        Ok(trucks.len())
    }

    pub fn list(&self) -> RepositoryResult<Vec<Truck>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT truck_id, plate_number, fuel_type, capacity_l, driver, retired
             FROM truck ORDER BY truck_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut trucks = Vec::new();
        for row in rows {
            let (id, plate_number, fuel, capacity_l, driver, retired) = row?;
            trucks.push(Truck {
                fuel_type: parse_fuel("truck.fuel_type", &fuel)?,
                id,
                plate_number,
                capacity_l,
                driver,
                retired,
            });
        }
        Ok(trucks)
    }

    pub fn find_by_id(&self, truck_id: &str) -> RepositoryResult<Truck> {
        self.list()?
            .into_iter()
            .find(|t| t.id == truck_id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "truck".to_string(),
                id: truck_id.to_string(),
            })
    }
}

fn upsert_row(conn: &Connection, truck: &Truck) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO truck (truck_id, plate_number, fuel_type, capacity_l, driver, retired)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(truck_id) DO UPDATE SET
            plate_number = excluded.plate_number,
            fuel_type = excluded.fuel_type,
            capacity_l = excluded.capacity_l,
            driver = excluded.driver,
            retired = excluded.retired",
        params![
            truck.id,
            truck.plate_number,
            truck.fuel_type.code(),
            truck.capacity_l,
            truck.driver,
            truck.retired,
        ],
    )
}
