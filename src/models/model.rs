//! Trained price model and the artifacts that travel with it.
//!
//! The core only ever calls `predict` on a reconciled feature vector. The
//! artifacts (model, encoders, expected column order) are produced together
//! by training and loaded together here; none of them is rebuilt at
//! inference time.

use std::collections::BTreeMap;
use std::path::Path;

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::{EncoderSet, FeatureVector};

pub const MODEL_FILE: &str = "model.json";
pub const ENCODERS_FILE: &str = "encoders.json";
pub const COLUMNS_FILE: &str = "columns.json";

/// Anything that maps a feature vector to a price.
pub trait PriceModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, AppError>;
}

/// Linear regressor: `intercept + sum(coefficient * feature)`.
///
/// Features without a coefficient contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

impl PriceModel for LinearModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, AppError> {
        let x = DVector::from_vec(features.values());
        let w = DVector::from_iterator(
            features.len(),
            features
                .names()
                .map(|name| self.coefficients.get(name).copied().unwrap_or(0.0)),
        );
        let y = self.intercept + w.dot(&x);
        if !y.is_finite() {
            return Err(AppError::upstream("Non-finite model prediction."));
        }
        Ok(y)
    }
}

/// Model + encoders + expected columns, loaded as one unit.
pub struct ModelArtifacts {
    pub model: Box<dyn PriceModel>,
    pub encoders: EncoderSet,
    pub expected_columns: Vec<String>,
}

impl std::fmt::Debug for ModelArtifacts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelArtifacts")
            .field("encoders", &self.encoders)
            .field("expected_columns", &self.expected_columns)
            .finish_non_exhaustive()
    }
}

impl ModelArtifacts {
    pub fn new(model: Box<dyn PriceModel>, encoders: EncoderSet, expected_columns: Vec<String>) -> Self {
        Self {
            model,
            encoders,
            expected_columns,
        }
    }

    /// Load `model.json`, `encoders.json`, and `columns.json` from `dir`.
    pub fn load(dir: &Path) -> Result<Self, AppError> {
        let model: LinearModel = read_json(&dir.join(MODEL_FILE))?;
        let encoders = EncoderSet::load(&dir.join(ENCODERS_FILE))?;
        let expected_columns: Vec<String> = read_json(&dir.join(COLUMNS_FILE))?;
        if expected_columns.is_empty() {
            return Err(AppError::input(format!(
                "'{}' lists no feature columns.",
                dir.join(COLUMNS_FILE).display()
            )));
        }
        Ok(Self::new(Box::new(model), encoders, expected_columns))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::input(format!("Failed to read model artifact '{}': {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| AppError::input(format!("Invalid model artifact '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::CategoricalSelections;
    use crate::series::MacroFrame;

    #[test]
    fn linear_model_dot_product() {
        let model: LinearModel =
            serde_json::from_str(r#"{"intercept": 1.5, "coefficients": {"year": 0.001, "month": 0.1, "unused": 9.0}}"#)
                .unwrap();
        let expected = vec!["year".to_string(), "month".to_string(), "product".to_string()];
        let encoders: EncoderSet = serde_json::from_str(r#"{"product": ["GASOLINA"]}"#).unwrap();
        let fv = crate::features::build(
            &MacroFrame::default(),
            &CategoricalSelections::product_only("GASOLINA"),
            NaiveDate::from_ymd_opt(2000, 5, 1).unwrap(),
            &encoders,
            &expected,
        )
        .unwrap();

        let y = model.predict(&fv).unwrap();
        assert!((y - (1.5 + 2.0 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn artifacts_load_together() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), r#"{"intercept": 5.0, "coefficients": {}}"#).unwrap();
        std::fs::write(dir.path().join(ENCODERS_FILE), r#"{"product": ["DIESEL"]}"#).unwrap();
        std::fs::write(dir.path().join(COLUMNS_FILE), r#"["product", "year"]"#).unwrap();

        let artifacts = ModelArtifacts::load(dir.path()).unwrap();
        assert_eq!(artifacts.expected_columns, vec!["product".to_string(), "year".to_string()]);
        assert!(artifacts.encoders.get("product").is_some());
    }

    #[test]
    fn missing_artifact_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MODEL_FILE), r#"{"intercept": 5.0, "coefficients": {}}"#).unwrap();

        let err = ModelArtifacts::load(dir.path()).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INPUT);
        assert!(err.message().contains(ENCODERS_FILE));
    }
}
