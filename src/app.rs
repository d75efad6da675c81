//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and resolves settings
//! - bootstraps the data directory layout and the run log
//! - dispatches to the shared pipelines
//! - prints reports

use std::time::Duration;

use clap::Parser;
use tracing::info;

use crate::cli::{Command, ForecastArgs, HistoryArgs, MacroArgs, OptionsArgs, PredictArgs, SelectionArgs};
use crate::config::{Settings, hours_to_duration};
use crate::data::CachePolicy;
use crate::domain::{CategoricalSelections, Selection};
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `fuelcast` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    let mut settings = Settings::from_env()?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    settings.ensure_dirs()?;
    crate::logging::init(&settings.log_dir())?;
    info!(data_dir = %settings.data_dir.display(), "fuelcast starting");

    match cli.command {
        Command::Macro(args) => handle_macro(settings, &args),
        Command::Ingest => handle_ingest(&settings),
        Command::Predict(args) => handle_predict(&settings, &args),
        Command::History(args) => handle_history(&settings, &args),
        Command::Forecast(args) => handle_forecast(&settings, &args),
        Command::Options(args) => handle_options(&settings, &args),
    }
}

fn handle_macro(mut settings: Settings, args: &MacroArgs) -> Result<(), AppError> {
    if args.refresh {
        settings.cache_policy = CachePolicy::RefreshIfOlderThan(Duration::ZERO);
    } else if let Some(hours) = args.max_age_hours {
        settings.cache_policy = CachePolicy::RefreshIfOlderThan(hours_to_duration(hours));
    }

    let run = pipeline::run_macro_pipeline(&settings)?;
    println!("{}", crate::report::format_macro_summary(&run.frame, &run.output));
    Ok(())
}

fn handle_ingest(settings: &Settings) -> Result<(), AppError> {
    match pipeline::run_fuel_ingestion(settings)? {
        Some(run) => {
            println!(
                "{}",
                crate::report::format_ingest_summary(&run.report, &run.dataset, &run.output)
            );
        }
        None => {
            println!(
                "No valid fuel files in '{}'; nothing to unify.",
                settings.fuel_input_dir().display()
            );
        }
    }
    Ok(())
}

fn handle_predict(settings: &Settings, args: &PredictArgs) -> Result<(), AppError> {
    let forecaster = pipeline::load_forecaster(settings)?;
    let selections = selections_from_args(&args.selection);
    let price = forecaster.predict(&selections, args.date)?;
    println!("{}", crate::report::format_prediction(&selections, args.date, price));
    Ok(())
}

fn handle_history(settings: &Settings, args: &HistoryArgs) -> Result<(), AppError> {
    let fuel = pipeline::load_fuel_dataset(settings)?;
    let selections = selections_from_args(&args.selection);
    let series = fuel.historical_series(&selections);
    let title = format!("Historical average price: {}", selections.product);
    println!("{}", crate::report::format_series(&title, &series, args.last));
    Ok(())
}

fn handle_forecast(settings: &Settings, args: &ForecastArgs) -> Result<(), AppError> {
    let forecaster = pipeline::load_forecaster(settings)?;
    let selections = selections_from_args(&args.selection);
    let start = forecast_start(args, settings);
    let path = forecaster.forecast_path(&selections, start, args.to)?;
    let title = format!("Forecast: {} ({start} .. {})", selections.product, args.to);
    println!("{}", crate::report::format_series(&title, &path, None));
    Ok(())
}

fn handle_options(settings: &Settings, args: &OptionsArgs) -> Result<(), AppError> {
    let fuel = pipeline::load_fuel_dataset(settings)?;
    if fuel.is_empty() {
        return Err(AppError::no_data("The fuel dataset is empty."));
    }

    match (&args.product, &args.state) {
        (Some(product), Some(state)) => {
            let values = fuel.municipalities_for(product, state);
            println!("{}", crate::report::format_options(&format!("Municipalities for {product} in {state}"), &values));
        }
        (Some(product), None) => {
            let values = fuel.states_for(product);
            println!("{}", crate::report::format_options(&format!("States for {product}"), &values));
        }
        (None, _) => {
            println!("{}", crate::report::format_options("Products", &fuel.products()));
            println!("{}", crate::report::format_options("Brands", &fuel.brands()));
        }
    }
    Ok(())
}

fn forecast_start(args: &ForecastArgs, settings: &Settings) -> chrono::NaiveDate {
    args.from.unwrap_or(settings.forecast_start)
}

pub fn selections_from_args(args: &SelectionArgs) -> CategoricalSelections {
    CategoricalSelections {
        product: args.product.trim().to_string(),
        state: Selection::parse(&args.state),
        municipality: Selection::parse(&args.municipality),
        brand: Selection::parse(&args.brand),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn forecast_args(argv: &[&str]) -> ForecastArgs {
        match Cli::parse_from(argv).command {
            Command::Forecast(args) => args,
            other => panic!("expected forecast, got {other:?}"),
        }
    }

    #[test]
    fn forecast_starts_at_configured_date_by_default() {
        let settings = Settings::default();
        let args = forecast_args(&["fuelcast", "forecast", "-p", "DIESEL", "--to", "2024-06-30"]);

        let start = forecast_start(&args, &settings);
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());

        let explicit = forecast_args(&["fuelcast", "forecast", "-p", "DIESEL", "--from", "2024-06-01", "--to", "2024-06-30"]);
        assert_eq!(forecast_start(&explicit, &settings), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn selections_parse_all_labels() {
        let args = forecast_args(&["fuelcast", "forecast", "-p", " ETANOL ", "-s", "SP", "--to", "2025-02-01"]);
        let selections = selections_from_args(&args.selection);
        assert_eq!(selections.product, "ETANOL");
        assert_eq!(selections.state, Selection::Only("SP".to_string()));
        assert_eq!(selections.municipality, Selection::All);
    }
}
