// ==========================================
// Fuel Dispatch - Import layer
// ==========================================
// CSV files -> validated stations and trucks.
// Registration happens in the caller (api layer).
// ==========================================

pub mod csv_reader;
pub mod error;
pub mod fleet_importer;

pub use csv_reader::{read_csv, read_csv_file, RawRecord};
pub use error::{ImportError, ImportResult};
pub use fleet_importer::{StationImporter, TruckImporter};
