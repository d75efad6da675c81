//! The consumer-facing prediction service.
//!
//! Holds the persisted macro dataset, the unified fuel dataset, and the
//! model artifacts in memory. Every call is a pure transformation over that
//! state: no network, no writes.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{CategoricalSelections, Selection, UnifiedFuelDataset};
use crate::error::AppError;
use crate::features;
use crate::models::ModelArtifacts;
use crate::series::MacroFrame;

#[derive(Debug)]
pub struct Forecaster {
    macro_frame: MacroFrame,
    fuel: UnifiedFuelDataset,
    artifacts: ModelArtifacts,
}

impl Forecaster {
    pub fn new(macro_frame: MacroFrame, fuel: UnifiedFuelDataset, artifacts: ModelArtifacts) -> Self {
        Self {
            macro_frame,
            fuel,
            artifacts,
        }
    }

    pub fn fuel(&self) -> &UnifiedFuelDataset {
        &self.fuel
    }

    /// Predicted price for one selection on `target_date`.
    ///
    /// `state`, `municipality`, and `brand` accept the "Todos"/"Todas"
    /// labels to mean no filter.
    pub fn predict_price(
        &self,
        product: &str,
        state: &str,
        municipality: &str,
        brand: &str,
        target_date: NaiveDate,
    ) -> Result<f64, AppError> {
        let selections = CategoricalSelections {
            product: product.trim().to_string(),
            state: Selection::parse(state),
            municipality: Selection::parse(municipality),
            brand: Selection::parse(brand),
        };
        self.predict(&selections, target_date)
    }

    pub fn predict(&self, selections: &CategoricalSelections, target_date: NaiveDate) -> Result<f64, AppError> {
        let selections = selections.normalized();
        let fv = features::build(
            &self.macro_frame,
            &selections,
            target_date,
            &self.artifacts.encoders,
            &self.artifacts.expected_columns,
        )?;
        debug!(?target_date, features = ?fv.entries(), "Feature vector built");
        self.artifacts.model.predict(&fv)
    }

    /// One prediction per day from `start` through `end`, inclusive.
    pub fn forecast_path(
        &self,
        selections: &CategoricalSelections,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, f64)>, AppError> {
        if end < start {
            return Err(AppError::input(format!("Forecast end {end} is before start {start}.")));
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|d| self.predict(selections, d).map(|p| (d, p)))
            .collect()
    }

    /// Average observed price per collection date.
    pub fn historical_series(&self, selections: &CategoricalSelections) -> Vec<(NaiveDate, f64)> {
        self.fuel.historical_series(selections)
    }
}
