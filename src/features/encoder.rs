//! Frozen categorical encoders.
//!
//! Codes are assigned at training time and shipped next to the model. The
//! encoder only looks labels up; it is never refit here.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::features::FeatureError;

/// Code used for a dimension the caller left unselected. Real codes start
/// at zero, so this never collides with a trained category.
pub const UNSELECTED_CODE: f64 = -1.0;

/// Ordered label list; a label's code is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoricalEncoder {
    labels: Vec<String>,
}

impl CategoricalEncoder {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn code(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// Encoders keyed by feature column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncoderSet {
    encoders: BTreeMap<String, CategoricalEncoder>,
}

impl EncoderSet {
    pub fn new(encoders: BTreeMap<String, CategoricalEncoder>) -> Self {
        Self { encoders }
    }

    pub fn get(&self, column: &str) -> Option<&CategoricalEncoder> {
        self.encoders.get(column)
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::input(format!("Failed to read encoders '{}': {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::input(format!("Invalid encoders JSON '{}': {e}", path.display())))
    }

    /// Encode a label for `column`.
    ///
    /// A column without a trained encoder is not an error: the value is
    /// simply left out and reconciliation decides what the model sees.
    pub fn encode(&self, column: &str, label: &str) -> Result<Option<f64>, FeatureError> {
        let Some(encoder) = self.encoders.get(column) else {
            return Ok(None);
        };
        encoder
            .code(label)
            .map(|c| Some(c as f64))
            .ok_or_else(|| FeatureError::UnknownCategory {
                column: column.to_string(),
                label: label.to_string(),
            })
    }
}
