//! Raw fuel-price file ingest and normalization.
//!
//! This module turns a directory of the regulator's semicolon-delimited
//! survey exports into one clean `UnifiedFuelDataset`.
//!
//! Design goals:
//! - **File-level validation**: a file missing a required column is skipped
//!   and logged, never fatal for the run
//! - **Record-level coercion**: bad dates / prices drop the single record,
//!   counted per cause
//! - **Deterministic behavior**: files are processed in name order

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use csv::StringRecord;
use tracing::{info, warn};

use crate::domain::{
    FuelPriceRecord, RECOGNIZED_PRODUCTS, UNKNOWN_BRAND, UNKNOWN_NEIGHBORHOOD, UNKNOWN_STREET_NUMBER,
    UnifiedFuelDataset,
};
use crate::error::AppError;

pub const COL_REGION: &str = "Regiao - Sigla";
pub const COL_STATE: &str = "Estado - Sigla";
pub const COL_MUNICIPALITY: &str = "Municipio";
pub const COL_RESELLER: &str = "Revenda";
pub const COL_STREET: &str = "Nome da Rua";
pub const COL_STREET_NUMBER: &str = "Numero Rua";
pub const COL_NEIGHBORHOOD: &str = "Bairro";
pub const COL_ZIP: &str = "Cep";
pub const COL_PRODUCT: &str = "Produto";
pub const COL_DATE: &str = "Data da Coleta";
pub const COL_PRICE: &str = "Valor de Venda";
pub const COL_UNIT: &str = "Unidade de Medida";
pub const COL_BRAND: &str = "Bandeira";

pub const REQUIRED_COLUMNS: [&str; 6] = [COL_REGION, COL_STATE, COL_MUNICIPALITY, COL_PRODUCT, COL_PRICE, COL_DATE];

/// Columns known to be irrelevant; never carried into the unified dataset.
pub const IGNORED_COLUMNS: [&str; 2] = ["Complemento", "Valor de Compra"];

const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Inclusive plausible sale-price range, in BRL per unit.
    pub price_min: f64,
    pub price_max: f64,
    pub products: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            price_min: 1.0,
            price_max: 50.0,
            products: RECOGNIZED_PRODUCTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Windows1252,
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    pub file_name: String,
    pub encoding: TextEncoding,
    pub rows_read: usize,
    pub malformed: usize,
    pub bad_date: usize,
    pub bad_price: usize,
    pub outliers: usize,
    pub rows_kept: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IngestReport {
    pub files: Vec<FileReport>,
    pub skipped: Vec<SkippedFile>,
    pub duplicates_removed: usize,
    pub unrecognized_product: usize,
}

impl IngestReport {
    pub fn rows_read(&self) -> usize {
        self.files.iter().map(|f| f.rows_read).sum()
    }

    pub fn dropped_bad_date(&self) -> usize {
        self.files.iter().map(|f| f.bad_date).sum()
    }

    pub fn dropped_bad_price(&self) -> usize {
        self.files.iter().map(|f| f.bad_price).sum()
    }

    pub fn dropped_outliers(&self) -> usize {
        self.files.iter().map(|f| f.outliers).sum()
    }
}

/// Ingest output: unified dataset + per-file accounting.
#[derive(Debug, Clone)]
pub struct IngestedFuelData {
    pub dataset: UnifiedFuelDataset,
    pub report: IngestReport,
}

/// Ingest every `*.csv` file in `dir`.
///
/// Returns `Ok(None)` when no file was usable; that is a no-op run, not an
/// error. Only an unreadable directory is fatal.
pub fn ingest_directory(dir: &Path, config: &IngestConfig) -> Result<Option<IngestedFuelData>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::input(format!("Failed to read input dir '{}': {e}", dir.display())))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();

    let mut report = IngestReport::default();
    let mut batches: Vec<Vec<FuelPriceRecord>> = Vec::new();

    for path in &paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!(file = %file_name, "Reading fuel file");

        match ingest_file(path, config) {
            Ok((records, file_report)) => {
                batches.push(records);
                report.files.push(file_report);
            }
            Err(reason) => {
                warn!(file = %file_name, "Skipping file: {reason}");
                report.skipped.push(SkippedFile { file_name, reason });
            }
        }
    }

    if report.files.is_empty() {
        info!(dir = %dir.display(), "No valid files found to unify");
        return Ok(None);
    }

    let dataset = unify(batches, config, &mut report);
    info!(
        files = report.files.len(),
        skipped = report.skipped.len(),
        rows = dataset.len(),
        duplicates = report.duplicates_removed,
        unrecognized_product = report.unrecognized_product,
        "Unified fuel dataset built"
    );

    Ok(Some(IngestedFuelData { dataset, report }))
}

/// Read, validate, and clean one file.
///
/// `Err` carries the reason the whole file was rejected.
pub fn ingest_file(path: &Path, config: &IngestConfig) -> Result<(Vec<FuelPriceRecord>, FileReport), String> {
    let bytes = fs::read(path).map_err(|e| format!("read failed: {e}"))?;
    let (text, encoding) = decode_text(&bytes)?;
    if encoding == TextEncoding::Windows1252 {
        info!(file = %path.display(), "Not valid UTF-8; decoded as Windows-1252");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| format!("unreadable header: {e}"))?
        .clone();
    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut file_report = FileReport {
        file_name: file_name.clone(),
        encoding,
        rows_read: 0,
        malformed: 0,
        bad_date: 0,
        bad_price: 0,
        outliers: 0,
        rows_kept: 0,
    };

    let mut records = Vec::new();
    for result in reader.records() {
        file_report.rows_read += 1;
        let raw = match result {
            Ok(r) => r,
            Err(_) => {
                file_report.malformed += 1;
                continue;
            }
        };

        match parse_record(&raw, &header_map) {
            Ok(record) => {
                if record.sale_price < config.price_min || record.sale_price > config.price_max {
                    file_report.outliers += 1;
                } else {
                    records.push(record);
                }
            }
            Err(RecordFault::BadDate) => file_report.bad_date += 1,
            Err(RecordFault::BadPrice) => file_report.bad_price += 1,
        }
    }
    file_report.rows_kept = records.len();

    if file_report.bad_date > 0 {
        warn!(file = %file_name, dropped = file_report.bad_date, "`{COL_DATE}` values not parseable as dates");
    }
    if file_report.bad_price > 0 {
        warn!(file = %file_name, dropped = file_report.bad_price, "`{COL_PRICE}` values not numeric");
    }
    if file_report.malformed > 0 {
        warn!(file = %file_name, dropped = file_report.malformed, "Malformed CSV records");
    }
    info!(
        file = %file_name,
        removed = file_report.outliers,
        "{} records removed as outliers in column {COL_PRICE}",
        file_report.outliers
    );

    Ok((records, file_report))
}

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decode as UTF-8, falling back once to Windows-1252. A leading UTF-8
/// byte-order mark is dropped before the fallback.
pub fn decode_text(bytes: &[u8]) -> Result<(String, TextEncoding), String> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((text.to_string(), TextEncoding::Utf8)),
        Err(_) => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes))
            .map(|text| (text.into_owned(), TextEncoding::Windows1252))
            .ok_or_else(|| "not decodable as UTF-8 or Windows-1252".to_string()),
    }
}

/// Column name with surrounding whitespace and a byte-order-mark prefix
/// removed (e.g. `"\u{feff}Regiao - Sigla"` -> `"Regiao - Sigla"`).
pub fn clean_column_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

/// Map of cleaned column name to index. When a name repeats, the first
/// column wins and the later duplicates are ignored.
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        let name = clean_column_name(name);
        if IGNORED_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        map.entry(name).or_insert(idx);
    }
    map
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), String> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !header_map.contains_key(*c))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!("missing required column(s): {}", missing.join(", ")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordFault {
    BadDate,
    BadPrice,
}

fn parse_record(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<FuelPriceRecord, RecordFault> {
    let text = |name: &str| get_optional(record, header_map, name).unwrap_or_default().to_string();
    let optional = |name: &str| get_optional(record, header_map, name).map(str::to_string);
    let or_sentinel = |name: &str, sentinel: &str| {
        get_optional(record, header_map, name)
            .unwrap_or(sentinel)
            .to_string()
    };

    let collection_date = get_optional(record, header_map, COL_DATE)
        .and_then(parse_date)
        .ok_or(RecordFault::BadDate)?;
    let sale_price = get_optional(record, header_map, COL_PRICE)
        .and_then(parse_price)
        .ok_or(RecordFault::BadPrice)?;

    Ok(FuelPriceRecord {
        region_code: text(COL_REGION),
        state_code: text(COL_STATE),
        municipality: text(COL_MUNICIPALITY),
        reseller: optional(COL_RESELLER),
        street: optional(COL_STREET),
        street_number: or_sentinel(COL_STREET_NUMBER, UNKNOWN_STREET_NUMBER),
        neighborhood: or_sentinel(COL_NEIGHBORHOOD, UNKNOWN_NEIGHBORHOOD),
        zip_code: optional(COL_ZIP),
        product: text(COL_PRODUCT),
        collection_date,
        sale_price,
        unit: optional(COL_UNIT),
        brand: or_sentinel(COL_BRAND, UNKNOWN_BRAND),
    })
}

/// Concatenate per-file batches, drop exact duplicates, keep recognized
/// products only.
fn unify(batches: Vec<Vec<FuelPriceRecord>>, config: &IngestConfig, report: &mut IngestReport) -> UnifiedFuelDataset {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for record in batches.into_iter().flatten() {
        if !seen.insert(dedup_key(&record)) {
            report.duplicates_removed += 1;
            continue;
        }
        if !config.products.iter().any(|p| *p == record.product) {
            report.unrecognized_product += 1;
            continue;
        }
        records.push(record);
    }
    UnifiedFuelDataset::new(records)
}

fn dedup_key(r: &FuelPriceRecord) -> (String, NaiveDate, u64) {
    let opt = |v: &Option<String>| v.clone().unwrap_or_default();
    let text = [
        r.region_code.clone(),
        r.state_code.clone(),
        r.municipality.clone(),
        opt(&r.reseller),
        opt(&r.street),
        r.street_number.clone(),
        r.neighborhood.clone(),
        opt(&r.zip_code),
        r.product.clone(),
        opt(&r.unit),
        r.brand.clone(),
    ]
    .join("\u{1f}");
    (text, r.collection_date, r.sale_price.to_bits())
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Survey prices use a decimal comma (`"5,49"`).
fn parse_price(s: &str) -> Option<f64> {
    let v = s.replace(',', ".").parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
