//! Model-ready feature vectors.
//!
//! Macro features are long-run means over the whole integrated history, not
//! a lookup at the target date. The model was trained on that shape of
//! input, so changing it changes what the predictions mean.

use chrono::{Datelike, NaiveDate};

use crate::domain::{CategoricalSelections, Selection};
use crate::features::{EncoderSet, FeatureError, UNSELECTED_CODE};
use crate::series::MacroFrame;

pub const COL_YEAR: &str = "year";
pub const COL_MONTH: &str = "month";
pub const COL_PRODUCT: &str = "product";
pub const COL_STATE: &str = "state_code";
pub const COL_MUNICIPALITY: &str = "municipality";
pub const COL_BRAND: &str = "brand";

/// Named numeric inputs in the exact order the model consumes them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, v)| *v).collect()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Reorder to `expected`: missing columns become 0, extra columns are
    /// dropped.
    pub fn reconcile(&self, expected: &[String]) -> FeatureVector {
        FeatureVector {
            entries: expected
                .iter()
                .map(|name| (name.clone(), self.get(name).unwrap_or(0.0)))
                .collect(),
        }
    }
}

/// Build the vector for one prediction request.
///
/// The product is always encoded; the other dimensions encode to
/// `UNSELECTED_CODE` when left at "all".
pub fn build(
    macro_frame: &MacroFrame,
    selections: &CategoricalSelections,
    target_date: NaiveDate,
    encoders: &EncoderSet,
    expected_columns: &[String],
) -> Result<FeatureVector, FeatureError> {
    let mut raw = FeatureVector::default();

    for column in macro_frame.columns() {
        // A column with no defined value is left for reconciliation to fill.
        if let Some(mean) = macro_frame.column_mean(column) {
            raw.push(column.as_str(), mean);
        }
    }

    raw.push(COL_YEAR, f64::from(target_date.year()));
    raw.push(COL_MONTH, f64::from(target_date.month()));

    if let Some(code) = encoders.encode(COL_PRODUCT, &selections.product)? {
        raw.push(COL_PRODUCT, code);
    }
    for (column, selection) in [
        (COL_STATE, &selections.state),
        (COL_MUNICIPALITY, &selections.municipality),
        (COL_BRAND, &selections.brand),
    ] {
        match selection {
            Selection::All => raw.push(column, UNSELECTED_CODE),
            Selection::Only(label) => {
                if let Some(code) = encoders.encode(column, label)? {
                    raw.push(column, code);
                }
            }
        }
    }

    Ok(raw.reconcile(expected_columns))
}
