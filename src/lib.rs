//! `fuelcast` library crate.
//!
//! The binary (`fuelcast`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the pipelines and the `Forecaster` can be driven by another front-end
//!   (a dashboard, a notebook) without going through the CLI

pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod io;
pub mod logging;
pub mod models;
pub mod report;
pub mod series;
