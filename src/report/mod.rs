//! Terminal reporting for pipeline runs and predictions.

pub mod format;

pub use format::*;
