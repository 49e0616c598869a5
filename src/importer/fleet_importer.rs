// ==========================================
// Fuel Dispatch - Station & truck CSV importers
// ==========================================
// stations.csv: one row per tank
//   station_id,name,address,lat,lon,fuel_type,current,min,max
//   rows of the same station_id are merged in file order
// trucks.csv:
//   truck_id,plate_number,fuel_type,capacity_l,driver
// ==========================================

use crate::domain::station::{FuelLevel, Station};
use crate::domain::truck::Truck;
use crate::importer::csv_reader::{read_csv_file, RawRecord};
use crate::importer::error::{ImportError, ImportResult};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

pub struct StationImporter;

impl StationImporter {
    pub fn import_file(path: &Path) -> ImportResult<Vec<Station>> {
        let records = read_csv_file(path)?;
        let stations = Self::from_records(&records)?;
        info!(path = %path.display(), stations = stations.len(), "stations imported");
        Ok(stations)
    }

    pub fn from_records(records: &[RawRecord]) -> ImportResult<Vec<Station>> {
        let mut stations: Vec<(usize, Station)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for record in records {
            let id = record.text("station_id")?;
            let level = FuelLevel::new(
                record.fuel_type("fuel_type")?,
                record.number("current")?,
                record.number("min")?,
                record.number("max")?,
            );

            match index.get(&id) {
                Some(&pos) => stations[pos].1.fuel_levels.push(level),
                None => {
                    let station = Station::new(
                        &id,
                        &record.text("name")?,
                        &record.text_or_empty("address"),
                        (record.number("lat")?, record.number("lon")?),
                    )
                    .with_level(level);
                    index.insert(id, stations.len());
                    stations.push((record.row, station));
                }
            }
        }

        stations
            .into_iter()
            .map(|(row, station)| {
                station
                    .check_invariants()
                    .map_err(|message| ImportError::InvalidRecord { row, message })?;
                Ok(station)
            })
            .collect()
    }
}

pub struct TruckImporter;

impl TruckImporter {
    pub fn import_file(path: &Path) -> ImportResult<Vec<Truck>> {
        let records = read_csv_file(path)?;
        let trucks = Self::from_records(&records)?;
        info!(path = %path.display(), trucks = trucks.len(), "trucks imported");
        Ok(trucks)
    }

    pub fn from_records(records: &[RawRecord]) -> ImportResult<Vec<Truck>> {
        records
            .iter()
            .map(|record| {
                let truck = Truck::new(
                    &record.text("truck_id")?,
                    &record.text("plate_number")?,
                    record.fuel_type("fuel_type")?,
                    record.number("capacity_l")?,
                    &record.text_or_empty("driver"),
                );
                truck.check_attributes().map_err(|message| ImportError::InvalidRecord {
                    row: record.row,
                    message,
                })?;
                Ok(truck)
            })
            .collect()
    }
}
