//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the pipeline and inference code stays clean and testable
//! - output changes are localized

use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{CategoricalSelections, UnifiedFuelDataset};
use crate::io::ingest::{IngestReport, TextEncoding};
use crate::series::MacroFrame;

/// Summary of a saved macro dataset.
pub fn format_macro_summary(frame: &MacroFrame, output: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== fuelcast - macro dataset ===\n");

    let first = frame.dates().next();
    let last = frame.dates().last();
    match (first, last) {
        (Some(first), Some(last)) => out.push_str(&format!("Rows: {} | {first} .. {last}\n", frame.len())),
        _ => out.push_str("Rows: 0\n"),
    }
    out.push_str(&format!("Saved: {}\n\n", output.display()));

    out.push_str(&format!("{:<18} {:>8} {:>12}\n", "column", "defined", "mean"));
    out.push_str(&format!("{:-<18} {:-<8} {:-<12}\n", "", "", ""));
    for column in frame.columns() {
        let defined = frame
            .column_values(column)
            .map(|vs| vs.iter().flatten().count())
            .unwrap_or(0);
        let mean = frame
            .column_mean(column)
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!("{:<18} {:>8} {:>12}\n", truncate(column, 18), defined, mean));
    }
    out
}

/// Per-file accounting, null counts, and price statistics of an ingest run.
pub fn format_ingest_summary(report: &IngestReport, dataset: &UnifiedFuelDataset, output: &Path) -> String {
    let mut out = String::new();
    out.push_str("=== fuelcast - fuel ingestion ===\n");
    out.push_str(&format!(
        "Files: {} used, {} skipped | rows read={} kept={}\n",
        report.files.len(),
        report.skipped.len(),
        report.rows_read(),
        dataset.len()
    ));
    out.push_str(&format!(
        "Dropped: bad_date={} bad_price={} outliers={} duplicates={} other_products={}\n",
        report.dropped_bad_date(),
        report.dropped_bad_price(),
        report.dropped_outliers(),
        report.duplicates_removed,
        report.unrecognized_product
    ));
    out.push_str(&format!("Saved: {}\n\n", output.display()));

    out.push_str(&format!(
        "{:<32} {:>6} {:>9} {:>8} {:>9} {:>8} {:>9}\n",
        "file", "enc", "read", "bad_date", "bad_price", "outliers", "kept"
    ));
    out.push_str(&format!(
        "{:-<32} {:-<6} {:-<9} {:-<8} {:-<9} {:-<8} {:-<9}\n",
        "", "", "", "", "", "", ""
    ));
    for f in &report.files {
        let enc = match f.encoding {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Windows1252 => "cp1252",
        };
        out.push_str(&format!(
            "{:<32} {:>6} {:>9} {:>8} {:>9} {:>8} {:>9}\n",
            truncate(&f.file_name, 32),
            enc,
            f.rows_read,
            f.bad_date,
            f.bad_price,
            f.outliers,
            f.rows_kept
        ));
    }
    for s in &report.skipped {
        out.push_str(&format!("  (skipped {}) {}\n", s.file_name, s.reason));
    }

    out.push_str("\nMissing values per column:\n");
    for (column, count) in dataset.missing_counts() {
        out.push_str(&format!("  {column:<20} {count}\n"));
    }

    if let Some(s) = dataset.price_summary() {
        out.push_str("\nValor de Venda:\n");
        out.push_str(&format!("  count {}\n", s.count));
        for (label, v) in [
            ("mean", s.mean),
            ("std", s.std),
            ("min", s.min),
            ("25%", s.p25),
            ("50%", s.median),
            ("75%", s.p75),
            ("max", s.max),
        ] {
            out.push_str(&format!("  {label:<5} {v:.4}\n"));
        }
    }
    out
}

pub fn format_prediction(selections: &CategoricalSelections, target_date: NaiveDate, price: f64) -> String {
    format!(
        "{} | {} | {} | {} | {target_date}: R$ {price:.2}",
        selections.product,
        selections.state.as_label().unwrap_or("Todos"),
        selections.municipality.as_label().unwrap_or("Todas"),
        selections.brand.as_label().unwrap_or("Todas"),
    )
}

/// Two-column date/price table; `last` keeps only the most recent rows.
pub fn format_series(title: &str, series: &[(NaiveDate, f64)], last: Option<usize>) -> String {
    let mut out = String::new();
    out.push_str(&format!("{title}\n"));
    if series.is_empty() {
        out.push_str("(no data for this selection)\n");
        return out;
    }

    let skip = last.map(|n| series.len().saturating_sub(n)).unwrap_or(0);
    out.push_str(&format!("{:<12} {:>10}\n", "date", "price"));
    out.push_str(&format!("{:-<12} {:-<10}\n", "", ""));
    for (date, price) in &series[skip..] {
        out.push_str(&format!("{:<12} {:>10.3}\n", date.to_string(), price));
    }
    out
}

pub fn format_options(title: &str, values: &[String]) -> String {
    let mut out = format!("{title} ({}):\n", values.len());
    for v in values {
        out.push_str(&format!("  {v}\n"));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Selection;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    #[test]
    fn series_keeps_last_rows() {
        let series = vec![(d(1), 5.0), (d(2), 5.1), (d(3), 5.2)];
        let out = format_series("GASOLINA", &series, Some(2));

        assert!(!out.contains("2024-07-01"));
        assert!(out.contains("2024-07-02"));
        assert!(out.contains("5.200"));
    }

    #[test]
    fn empty_series_says_so() {
        assert!(format_series("DIESEL", &[], None).contains("no data"));
    }

    #[test]
    fn prediction_line_shows_all_labels() {
        let selections = CategoricalSelections {
            product: "ETANOL".to_string(),
            state: Selection::Only("SP".to_string()),
            municipality: Selection::All,
            brand: Selection::All,
        };
        assert_eq!(
            format_prediction(&selections, d(15), 4.1234),
            "ETANOL | SP | Todas | Todas | 2024-07-15: R$ 4.12"
        );
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("precos_2024_01.csv", 8), "precos_.");
        assert_eq!(truncate("ok", 8), "ok");
    }
}
