//! Date-indexed table of macro columns.
//!
//! `MacroFrame` is the one tabular shape used for adapter output, cache
//! contents, and the integrated dataset. Rows are kept in a `BTreeMap`, so
//! dates are unique and ascending by construction.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::MacroSeries;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MacroFrame {
    columns: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl MacroFrame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: BTreeMap::new(),
        }
    }

    /// Single-column frame named after the series tag.
    pub fn from_series(series: &MacroSeries) -> Self {
        let mut frame = Self::new(vec![series.tag().to_string()]);
        for obs in series.observations() {
            frame.rows.insert(obs.timestamp, vec![Some(obs.value)]);
        }
        frame
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (NaiveDate, &[Option<f64>])> + '_ {
        self.rows.iter().map(|(d, r)| (*d, r.as_slice()))
    }

    pub fn value(&self, date: NaiveDate, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.rows.get(&date).and_then(|r| r[idx])
    }

    /// Column values in date order (`None` where undefined).
    pub fn column_values(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(column)?;
        Some(self.rows.values().map(|r| r[idx]).collect())
    }

    /// Set one cell, creating the row (all undefined) and column as needed.
    pub fn set(&mut self, date: NaiveDate, column: &str, value: Option<f64>) {
        let idx = match self.column_index(column) {
            Some(idx) => idx,
            None => {
                self.columns.push(column.to_string());
                for row in self.rows.values_mut() {
                    row.push(None);
                }
                self.columns.len() - 1
            }
        };
        let width = self.columns.len();
        let row = self.rows.entry(date).or_insert_with(|| vec![None; width]);
        row[idx] = value;
    }

    /// Insert a full row; `values` must line up with `columns()`.
    pub fn insert_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.insert(date, values);
    }

    /// Outer join on date.
    ///
    /// Every date present on either side is kept. Columns of `other` that
    /// `self` lacks are appended; for a shared column, a defined value from
    /// `other` replaces the value from `self`.
    pub fn outer_join(&self, other: &MacroFrame) -> MacroFrame {
        let mut columns = self.columns.clone();
        for col in &other.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        let other_map: Vec<usize> = other
            .columns
            .iter()
            .map(|c| columns.iter().position(|x| x == c).unwrap_or_default())
            .collect();

        let width = columns.len();
        let mut rows: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();

        for (date, values) in &self.rows {
            let mut row = vec![None; width];
            row[..values.len()].copy_from_slice(values);
            rows.insert(*date, row);
        }
        for (date, values) in &other.rows {
            let row = rows.entry(*date).or_insert_with(|| vec![None; width]);
            for (src, &dst) in values.iter().zip(&other_map) {
                if src.is_some() {
                    row[dst] = *src;
                }
            }
        }

        MacroFrame { columns, rows }
    }

    /// Carry the last defined value of each column forward into later gaps.
    ///
    /// Leading gaps (no earlier observation) stay undefined.
    pub fn forward_fill(&mut self) {
        let mut last: Vec<Option<f64>> = vec![None; self.columns.len()];
        for row in self.rows.values_mut() {
            for (cell, carry) in row.iter_mut().zip(last.iter_mut()) {
                match cell {
                    Some(v) => *carry = Some(*v),
                    None => *cell = *carry,
                }
            }
        }
    }

    /// Drop every row dated before `start`.
    pub fn retain_from(&mut self, start: NaiveDate) {
        self.rows = self.rows.split_off(&start);
    }

    /// Mean of the defined values of a column, if it has any.
    pub fn column_mean(&self, column: &str) -> Option<f64> {
        let values = self.column_values(column)?;
        let defined: Vec<f64> = values.into_iter().flatten().filter(|v| v.is_finite()).collect();
        if defined.is_empty() {
            return None;
        }
        Some(defined.iter().sum::<f64>() / defined.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawObservation;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn series(tag: &str, points: &[(u32, f64)]) -> MacroFrame {
        MacroFrame::from_series(&MacroSeries::new(
            tag,
            points.iter().map(|(day, v)| RawObservation::new(d(*day), *v, tag)),
        ))
    }

    #[test]
    fn outer_join_keeps_rows_from_both_sides() {
        let brent = series("brent_price", &[(1, 80.0), (2, 81.0), (4, 82.0)]);
        let wti = series("wti_price", &[(2, 75.0), (3, 76.0)]);

        let joined = brent.outer_join(&wti);

        assert_eq!(joined.columns(), &["brent_price".to_string(), "wti_price".to_string()]);
        assert_eq!(joined.len(), 4);
        assert_eq!(joined.value(d(1), "wti_price"), None);
        assert_eq!(joined.value(d(3), "brent_price"), None);
        assert_eq!(joined.value(d(3), "wti_price"), Some(76.0));
    }

    #[test]
    fn forward_fill_leaves_leading_gaps() {
        let a = series("a", &[(2, 1.0), (4, 2.0)]);
        let b = series("b", &[(1, 10.0), (3, 11.0)]);
        let mut joined = a.outer_join(&b);
        joined.forward_fill();

        assert_eq!(joined.value(d(1), "a"), None);
        assert_eq!(joined.value(d(3), "a"), Some(1.0));
        assert_eq!(joined.value(d(4), "b"), Some(11.0));
    }

    #[test]
    fn set_grows_columns_and_rows() {
        let mut frame = MacroFrame::new(vec!["a".to_string()]);
        frame.set(d(1), "a", Some(1.0));
        frame.set(d(2), "b", Some(2.0));

        assert_eq!(frame.columns().len(), 2);
        assert_eq!(frame.value(d(1), "b"), None);
        assert_eq!(frame.value(d(2), "b"), Some(2.0));
    }

    #[test]
    fn retain_from_drops_earlier_rows() {
        let mut frame = series("a", &[(1, 1.0), (2, 2.0), (3, 3.0)]);
        frame.retain_from(d(2));
        assert_eq!(frame.dates().collect::<Vec<_>>(), vec![d(2), d(3)]);
    }

    #[test]
    fn column_mean_skips_undefined() {
        let a = series("a", &[(1, 2.0), (3, 4.0)]);
        let b = series("b", &[(2, 100.0)]);
        let joined = a.outer_join(&b);
        assert_eq!(joined.column_mean("a"), Some(3.0));
        assert_eq!(joined.column_mean("missing"), None);
    }
}
