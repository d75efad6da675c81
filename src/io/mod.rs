//! Input/output helpers.
//!
//! - raw fuel-file ingest + validation (`ingest`)
//! - processed dataset CSV read/write (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
