//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - macro observations and series (`RawObservation`, `MacroSeries`)
//! - fuel survey records and the unified dataset (`FuelPriceRecord`,
//!   `UnifiedFuelDataset`)
//! - categorical request filters (`Selection`, `CategoricalSelections`)

pub mod fuel;
pub mod types;

pub use fuel::*;
pub use types::*;
