//! Persisted CSV artifacts.
//!
//! Two shapes are written and read back:
//! - `MacroFrame` tables (source caches and the integrated macro dataset):
//!   a `Date` column followed by one column per variable, empty cell = undefined
//! - the unified fuel dataset, one `FuelPriceRecord` per row
//!
//! All files are UTF-8, comma-delimited.

use std::fs::{self, File};
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::FuelPriceRecord;
use crate::error::AppError;
use crate::io::ingest::clean_column_name;
use crate::series::MacroFrame;

pub const DATE_COLUMN: &str = "Date";

/// Write a frame, replacing any existing file wholesale.
///
/// Rows go to a sibling temp file first and are renamed into place, so a
/// reader never sees a half-written table.
pub fn write_frame_csv(path: &Path, frame: &MacroFrame) -> Result<(), AppError> {
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", tmp.display())))?;

        let mut header = vec![DATE_COLUMN.to_string()];
        header.extend(frame.columns().iter().cloned());
        writer
            .write_record(&header)
            .map_err(|e| AppError::input(format!("Failed to write CSV header: {e}")))?;

        for (date, values) in frame.rows() {
            let mut record = Vec::with_capacity(values.len() + 1);
            record.push(date.format("%Y-%m-%d").to_string());
            record.extend(values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
            writer
                .write_record(&record)
                .map_err(|e| AppError::input(format!("Failed to write CSV row: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| AppError::input(format!("Failed to flush '{}': {e}", tmp.display())))?;
    }
    fs::rename(&tmp, path)
        .map_err(|e| AppError::input(format!("Failed to move '{}' into place: {e}", path.display())))?;
    Ok(())
}

/// Read a frame written by `write_frame_csv`.
///
/// Rows with an unparseable date are skipped; unparseable cells read as
/// undefined.
pub fn read_frame_csv(path: &Path) -> Result<MacroFrame, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read headers of '{}': {e}", path.display())))?
        .clone();

    let names: Vec<String> = headers.iter().map(clean_column_name).collect();
    let date_idx = names
        .iter()
        .position(|h| h.eq_ignore_ascii_case(DATE_COLUMN))
        .ok_or_else(|| AppError::input(format!("'{}' has no `{DATE_COLUMN}` column.", path.display())))?;

    let value_cols: Vec<(usize, String)> = names
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != date_idx)
        .map(|(idx, name)| (idx, name.clone()))
        .collect();

    let mut frame = MacroFrame::new(value_cols.iter().map(|(_, n)| n.clone()).collect());

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => continue,
        };
        let Some(date) = record.get(date_idx).and_then(parse_iso_date) else {
            continue;
        };
        let values = value_cols
            .iter()
            .map(|(idx, _)| record.get(*idx).and_then(|s| s.parse::<f64>().ok()).filter(|v| v.is_finite()))
            .collect();
        frame.insert_row(date, values);
    }

    Ok(frame)
}

/// Accepts plain dates and the `YYYY-MM-DD HH:MM:SS` form some tools emit.
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Persist the unified fuel dataset.
pub fn write_fuel_csv(path: &Path, records: &[FuelPriceRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer
            .serialize(record)
            .map_err(|e| AppError::input(format!("Failed to write fuel record: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

/// Load the unified fuel dataset written by `write_fuel_csv`.
pub fn read_fuel_csv(path: &Path) -> Result<Vec<FuelPriceRecord>, AppError> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::input(format!("Failed to open '{}': {e}", path.display())))?;
    reader
        .deserialize()
        .collect::<Result<Vec<FuelPriceRecord>, _>>()
        .map_err(|e| AppError::input(format!("Invalid fuel dataset '{}': {e}", path.display())))
}
