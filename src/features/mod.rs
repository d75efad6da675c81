//! Feature construction for inference.
//!
//! - `encoder`: frozen categorical encoders loaded from model artifacts
//! - `builder`: macro means + date parts + codes, reconciled to the model's
//!   expected columns

use thiserror::Error;

use crate::error::AppError;

pub mod builder;
pub mod encoder;

pub use builder::{FeatureVector, build};
pub use encoder::{CategoricalEncoder, EncoderSet, UNSELECTED_CODE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureError {
    #[error("Unknown category '{label}' for column '{column}'; it was not seen at training time.")]
    UnknownCategory { column: String, label: String },
}

impl From<FeatureError> for AppError {
    fn from(err: FeatureError) -> Self {
        AppError::input(err.to_string())
    }
}
