// ==========================================
// Fuel Dispatch - CSV record reader
// ==========================================
// Header row required; cells are trimmed; blank rows are skipped.
// Row numbers are 1-based data rows (header excluded).
// ==========================================

use crate::domain::types::FuelType;
use crate::importer::error::{ImportError, ImportResult};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One data row keyed by trimmed header name
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub row: usize,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn text(&self, field: &str) -> ImportResult<String> {
        match self.fields.get(field) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(ImportError::MissingField {
                row: self.row,
                field: field.to_string(),
            }),
        }
    }

    pub fn text_or_empty(&self, field: &str) -> String {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    /// Number with optional space/underscore digit grouping and decimal comma
    pub fn number(&self, field: &str) -> ImportResult<f64> {
        let raw = self.text(field)?;
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .map(|c| if c == ',' { '.' } else { c })
            .collect();
        let value = cleaned
            .parse::<f64>()
            .map_err(|e| self.conversion_error(field, e.to_string()))?;
        if !value.is_finite() {
            return Err(self.conversion_error(field, format!("{} is not finite", raw)));
        }
        Ok(value)
    }

    pub fn fuel_type(&self, field: &str) -> ImportResult<FuelType> {
        let raw = self.text(field)?;
        FuelType::from_label(&raw)
            .ok_or_else(|| self.conversion_error(field, format!("unknown fuel type {}", raw)))
    }

    fn conversion_error(&self, field: &str, message: String) -> ImportError {
        ImportError::TypeConversionError {
            row: self.row,
            field: field.to_string(),
            message,
        }
    }
}

/// Reads a `.csv` file into raw records
pub fn read_csv_file(path: &Path) -> ImportResult<Vec<RawRecord>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    match path.extension() {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => {}
        Some(ext) => {
            return Err(ImportError::UnsupportedFormat(
                ext.to_string_lossy().to_string(),
            ))
        }
        None => return Err(ImportError::UnsupportedFormat(path.display().to_string())),
    }

    let records = read_csv(File::open(path)?)?;
    if records.is_empty() {
        return Err(ImportError::EmptyFile(path.display().to_string()));
    }
    Ok(records)
}

/// Reads CSV text from any reader
pub fn read_csv<R: Read>(source: R) -> ImportResult<Vec<RawRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result?;
        let mut fields = HashMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                fields.insert(header.clone(), value.to_string());
            }
        }

        if fields.values().all(|v| v.is_empty()) {
            continue;
        }
        records.push(RawRecord {
            row: row_idx + 1,
            fields,
        });
    }
    Ok(records)
}
