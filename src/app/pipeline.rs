//! Shared workflows used by every subcommand.
//!
//! - macro: four sources (through the cache) -> integrate -> persist
//! - fuel: raw survey files -> unified dataset -> persist
//! - service: persisted datasets + model artifacts -> `Forecaster`

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::data::bcb::BcbSeriesAdapter;
use crate::data::exchange::ExchangeRateAdapter;
use crate::data::oil::{OilPriceAdapter, YahooChart};
use crate::data::{FixedDelay, HttpTransport, LocalCache, ResilientFetcher, SourceAdapter, Transport, load_or_fetch};
use crate::domain::{DateWindow, UnifiedFuelDataset};
use crate::error::AppError;
use crate::forecast::Forecaster;
use crate::io::export::{read_fuel_csv, read_frame_csv, write_frame_csv, write_fuel_csv};
use crate::io::ingest::{IngestConfig, IngestReport, ingest_directory};
use crate::models::ModelArtifacts;
use crate::series::{MacroFrame, integrate};

/// Outputs of one macro pipeline run.
#[derive(Debug, Clone)]
pub struct MacroRun {
    pub frame: MacroFrame,
    pub output: PathBuf,
}

/// Outputs of one fuel ingestion run.
#[derive(Debug, Clone)]
pub struct FuelRun {
    pub dataset: UnifiedFuelDataset,
    pub report: IngestReport,
    pub output: PathBuf,
}

/// Fetch, integrate, and persist the macro dataset over live HTTP.
pub fn run_macro_pipeline(settings: &Settings) -> Result<MacroRun, AppError> {
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(settings.http_timeout)?);
    run_macro_pipeline_with(settings, transport)
}

/// Same as `run_macro_pipeline` with a caller-supplied transport.
pub fn run_macro_pipeline_with(settings: &Settings, transport: Arc<dyn Transport>) -> Result<MacroRun, AppError> {
    let fetcher = ResilientFetcher::new(
        transport,
        Arc::new(FixedDelay::new(settings.retry.attempts, settings.retry.delay)),
    );
    let oil_fetcher = fetcher.with_strategy(Arc::new(FixedDelay::new(
        settings.oil_retry.attempts,
        settings.oil_retry.delay,
    )));

    let adapters: Vec<(Box<dyn SourceAdapter>, DateWindow)> = vec![
        (
            Box::new(ExchangeRateAdapter::new(
                fetcher.clone(),
                &settings.awesomeapi_url,
                &settings.currency,
            )),
            settings.exchange_window,
        ),
        (
            Box::new(BcbSeriesAdapter::inflation(fetcher.clone(), &settings.bcb_url)),
            settings.window,
        ),
        (
            Box::new(OilPriceAdapter::new(Box::new(YahooChart::new(oil_fetcher, &settings.yahoo_url)))),
            settings.window,
        ),
        (
            Box::new(BcbSeriesAdapter::policy_rate(fetcher, &settings.bcb_url)),
            settings.window,
        ),
    ];

    let cache = LocalCache::new(settings.raw_dir(), settings.cache_policy);
    let frames: Vec<MacroFrame> = adapters
        .iter()
        .map(|(adapter, window)| load_or_fetch(adapter.as_ref(), &cache, window))
        .collect();

    // Cut after forward-fill so values carried into the output range survive.
    let mut integrated = integrate(&frames);
    integrated.retain_from(settings.output_start);
    if integrated.is_empty() {
        return Err(AppError::no_data(
            "No macro data available: every source failed and nothing was cached.",
        ));
    }

    let output = settings.macro_output_path();
    write_frame_csv(&output, &integrated)?;
    info!(rows = integrated.len(), path = %output.display(), "Macro dataset saved");

    Ok(MacroRun {
        frame: integrated,
        output,
    })
}

/// Unify the raw fuel files and persist the result.
///
/// `Ok(None)` when the input directory holds no usable file.
pub fn run_fuel_ingestion(settings: &Settings) -> Result<Option<FuelRun>, AppError> {
    let config = IngestConfig {
        price_min: settings.price_min,
        price_max: settings.price_max,
        ..IngestConfig::default()
    };
    let Some(ingested) = ingest_directory(&settings.fuel_input_dir(), &config)? else {
        return Ok(None);
    };

    let output = settings.fuel_output_path();
    write_fuel_csv(&output, ingested.dataset.records())?;
    info!(rows = ingested.dataset.len(), path = %output.display(), "Fuel dataset saved");

    Ok(Some(FuelRun {
        dataset: ingested.dataset,
        report: ingested.report,
        output,
    }))
}

/// Load the persisted fuel dataset on its own (history and options need no
/// model).
pub fn load_fuel_dataset(settings: &Settings) -> Result<UnifiedFuelDataset, AppError> {
    let path = settings.fuel_output_path();
    if !path.exists() {
        return Err(AppError::input(format!(
            "Fuel dataset '{}' not found. Run `fuelcast ingest` first.",
            path.display()
        )));
    }
    Ok(UnifiedFuelDataset::new(read_fuel_csv(&path)?))
}

/// Build the prediction service from persisted artifacts.
pub fn load_forecaster(settings: &Settings) -> Result<Forecaster, AppError> {
    let macro_path = settings.macro_output_path();
    if !macro_path.exists() {
        return Err(AppError::input(format!(
            "Macro dataset '{}' not found. Run `fuelcast macro` first.",
            macro_path.display()
        )));
    }
    let macro_frame = read_frame_csv(&macro_path)?;
    let fuel = load_fuel_dataset(settings)?;
    let artifacts = ModelArtifacts::load(&settings.models_dir())?;
    Ok(Forecaster::new(macro_frame, fuel, artifacts))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::config::RetrySettings;
    use crate::data::fetch::testing::{ScriptedTransport, server_error};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn settings(dir: &std::path::Path) -> Settings {
        let mut s = Settings::with_data_dir(dir);
        s.awesomeapi_url = "https://fx.test".to_string();
        s.bcb_url = "https://bcb.test".to_string();
        s.yahoo_url = "https://md.test".to_string();
        s.window = DateWindow::new(d(1, 1), d(12, 31));
        s.exchange_window = s.window;
        s.output_start = d(1, 3);
        s.retry = RetrySettings {
            attempts: 2,
            delay: Duration::ZERO,
        };
        s.oil_retry = s.retry.clone();
        s.ensure_dirs().unwrap();
        s
    }

    #[test]
    fn macro_run_integrates_cuts_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    "start_date=20240101",
                    vec![Ok(json!([
                        {"bid": "4.90", "timestamp": "1704067200"},
                        {"bid": "4.95", "timestamp": "1704326400"}
                    ]))],
                )
                .route("sgs.433", vec![Ok(json!([{"data": "01/01/2024", "valor": "0.42"}]))])
                .route("sgs.432", vec![server_error("sgs.432")])
                .route("chart/", vec![server_error("chart")]),
        );

        let run = run_macro_pipeline_with(&s, transport.clone()).unwrap();

        // 2024-01-01 is cut, its values carried into 2024-01-04.
        assert_eq!(run.frame.dates().collect::<Vec<_>>(), vec![d(1, 4)]);
        assert_eq!(run.frame.value(d(1, 4), "exchange_rate"), Some(4.95));
        assert_eq!(run.frame.value(d(1, 4), "inflation_index"), Some(0.42));
        assert_eq!(run.frame.value(d(1, 4), "brent_price"), None);
        assert!(run.output.exists());
        assert_eq!(transport.calls_matching("sgs.432"), 2);

        // Second run is served from the cache for the sources that had data.
        let before = transport.calls().len();
        run_macro_pipeline_with(&s, transport.clone()).unwrap();
        let repeated: Vec<String> = transport.calls()[before..].to_vec();
        assert!(repeated.iter().all(|u| !u.contains("fx.test") && !u.contains("sgs.433")));
    }

    fn chart(points: &[(i64, f64)]) -> serde_json::Value {
        let ts: Vec<i64> = points.iter().map(|(t, _)| *t).collect();
        let px: Vec<f64> = points.iter().map(|(_, p)| *p).collect();
        json!({"chart": {"result": [{"timestamp": ts, "indicators": {"quote": [{"close": px}]}}], "error": null}})
    }

    #[test]
    fn partial_oil_fetch_is_retried_on_the_next_run() {
        // 2024-01-04 at midnight UTC
        const JAN4: i64 = 1_704_326_400;
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());

        let failing_wti = Arc::new(
            ScriptedTransport::new()
                .route("chart/BZ=F", vec![Ok(chart(&[(JAN4, 78.0)]))])
                .route("chart/CL=F", vec![server_error("CL=F")]),
        );
        let first = run_macro_pipeline_with(&s, failing_wti).unwrap();
        assert_eq!(first.frame.value(d(1, 4), "brent_price"), Some(78.0));
        assert_eq!(first.frame.value(d(1, 4), "wti_price"), None);

        let healthy = Arc::new(
            ScriptedTransport::new()
                .route("chart/BZ=F", vec![Ok(chart(&[(JAN4, 78.0)]))])
                .route("chart/CL=F", vec![Ok(chart(&[(JAN4, 75.0)]))]),
        );
        let second = run_macro_pipeline_with(&s, healthy.clone()).unwrap();
        assert_eq!(healthy.calls_matching("chart/"), 2);
        assert_eq!(second.frame.value(d(1, 4), "wti_price"), Some(75.0));
    }

    #[test]
    fn exchange_rates_use_their_own_year_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.window = DateWindow::new(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(), d(12, 31));
        s.exchange_window = DateWindow::new(d(1, 1), d(12, 31));
        let transport = Arc::new(ScriptedTransport::new().route(
            "start_date=20240101",
            vec![Ok(json!([{"bid": "4.95", "timestamp": "1704326400"}]))],
        ));

        run_macro_pipeline_with(&s, transport.clone()).unwrap();

        assert_eq!(transport.calls_matching("fx.test"), 1);
        assert_eq!(transport.calls_matching("start_date=20230101"), 0);
        assert!(s.raw_dir().join("exchange_rate_USD_2024_2024.csv").is_file());
    }

    #[test]
    fn macro_run_with_nothing_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let err = run_macro_pipeline_with(&s, Arc::new(ScriptedTransport::new())).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_DATA);
    }

    #[test]
    fn fuel_run_persists_unified_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        fs::write(
            s.fuel_input_dir().join("ms.csv"),
            "Regiao - Sigla;Estado - Sigla;Municipio;Produto;Data da Coleta;Valor de Venda;Bandeira\n\
             CO;MS;DOURADOS;GASOLINA;02/01/2024;5,99;SHELL\n\
             CO;MS;DOURADOS;DIESEL;02/01/2024;0,50;SHELL\n",
        )
        .unwrap();

        let run = run_fuel_ingestion(&s).unwrap().unwrap();
        assert_eq!(run.dataset.len(), 1);
        assert_eq!(run.report.dropped_outliers(), 1);

        let reloaded = load_fuel_dataset(&s).unwrap();
        assert_eq!(reloaded, run.dataset);
    }

    #[test]
    fn fuel_run_without_files_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        assert!(run_fuel_ingestion(&s).unwrap().is_none());
        assert!(!s.fuel_output_path().exists());
    }

    #[test]
    fn forecaster_requires_persisted_datasets() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_forecaster(&settings(dir.path())).unwrap_err();
        assert!(err.message().contains("fuelcast macro"));
    }
}
