//! Command-line parsing for the fuel-price forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! the pipeline and inference code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "fuelcast", version, about = "Fuel price data pipeline and forecaster")]
pub struct Cli {
    /// Data root (overrides FUELCAST_DATA_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch macro series (through the local cache), integrate, and save them.
    Macro(MacroArgs),
    /// Unify the raw fuel-price survey files and save the result.
    Ingest,
    /// Predict the price for one selection on a target date.
    Predict(PredictArgs),
    /// Print the observed average price per collection date.
    History(HistoryArgs),
    /// Predict every day from a start date through a target date.
    Forecast(ForecastArgs),
    /// List the values available for each selection.
    Options(OptionsArgs),
}

#[derive(Debug, Args, Clone)]
pub struct MacroArgs {
    /// Ignore cached source data and fetch everything again.
    #[arg(long, conflicts_with = "max_age_hours")]
    pub refresh: bool,

    /// Refetch cached sources older than this many hours.
    #[arg(long, value_name = "HOURS")]
    pub max_age_hours: Option<u64>,
}

/// Categorical filters shared by prediction and history.
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    /// Fuel product (GASOLINA, DIESEL, ETANOL).
    #[arg(short = 'p', long)]
    pub product: String,

    /// State code, or "Todos".
    #[arg(short = 's', long, default_value = "Todos")]
    pub state: String,

    /// Municipality, or "Todas".
    #[arg(short = 'm', long, default_value = "Todas")]
    pub municipality: String,

    /// Brand, or "Todas".
    #[arg(short = 'b', long, default_value = "Todas")]
    pub brand: String,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Target date (YYYY-MM-DD).
    #[arg(short = 'd', long)]
    pub date: NaiveDate,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Only print the most recent N dates.
    #[arg(long)]
    pub last: Option<usize>,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// First day of the path (defaults to 2025-01-01).
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the path.
    #[arg(long)]
    pub to: NaiveDate,
}

#[derive(Debug, Args, Clone)]
pub struct OptionsArgs {
    /// Narrow states and municipalities to this product.
    #[arg(short = 'p', long)]
    pub product: Option<String>,

    /// Narrow municipalities to this state (needs --product).
    #[arg(short = 's', long, requires = "product")]
    pub state: Option<String>,
}
