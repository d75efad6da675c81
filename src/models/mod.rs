//! Price model interface and artifact loading.
//!
//! The model is a black box behind `PriceModel`; the shipped implementation
//! is a JSON linear regressor.

pub mod model;

pub use model::*;
