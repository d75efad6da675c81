//! Run settings: directory layout, endpoints, retry budgets, date windows.
//!
//! Components receive what they need from here explicitly; nothing reads
//! paths from globals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;

use crate::data::CachePolicy;
use crate::domain::DateWindow;
use crate::error::AppError;

pub const ENV_DATA_DIR: &str = "FUELCAST_DATA_DIR";
pub const ENV_AWESOMEAPI_URL: &str = "FUELCAST_AWESOMEAPI_URL";
pub const ENV_BCB_URL: &str = "FUELCAST_BCB_URL";
pub const ENV_YAHOO_URL: &str = "FUELCAST_YAHOO_URL";
pub const ENV_CACHE_MAX_AGE_HOURS: &str = "FUELCAST_CACHE_MAX_AGE_HOURS";

pub const MACRO_OUTPUT_FILE: &str = "macroeconomic_data.csv";
pub const FUEL_OUTPUT_FILE: &str = "precos_combustiveis_unificado.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub awesomeapi_url: String,
    pub bcb_url: String,
    pub yahoo_url: String,
    pub currency: String,
    pub window: DateWindow,
    /// Year range requested from the exchange-rate service.
    pub exchange_window: DateWindow,
    /// Rows before this date are cut from the persisted macro dataset.
    pub output_start: NaiveDate,
    /// First day of a forecast path when the caller gives none.
    pub forecast_start: NaiveDate,
    pub http_timeout: Duration,
    pub retry: RetrySettings,
    pub oil_retry: RetrySettings,
    pub cache_policy: CachePolicy,
    pub price_min: f64,
    pub price_max: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl Settings {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            awesomeapi_url: crate::data::exchange::DEFAULT_BASE_URL.to_string(),
            bcb_url: crate::data::bcb::DEFAULT_BASE_URL.to_string(),
            yahoo_url: crate::data::oil::DEFAULT_BASE_URL.to_string(),
            currency: "USD".to_string(),
            window: DateWindow::new(ymd(2018, 1, 1), ymd(2025, 1, 1)),
            exchange_window: DateWindow::new(ymd(2019, 1, 1), ymd(2025, 1, 1)),
            output_start: ymd(2019, 1, 1),
            forecast_start: ymd(2025, 1, 1),
            http_timeout: Duration::from_secs(10),
            retry: RetrySettings {
                attempts: 5,
                delay: Duration::from_secs(10),
            },
            oil_retry: RetrySettings {
                attempts: 5,
                delay: Duration::from_secs(60),
            },
            cache_policy: CachePolicy::AlwaysReuse,
            price_min: 1.0,
            price_max: 50.0,
        }
    }

    /// Defaults overridden by the environment (a `.env` file is honored).
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut settings = Self::with_data_dir(get(ENV_DATA_DIR).unwrap_or_else(|| "data".to_string()));
        if let Some(url) = get(ENV_AWESOMEAPI_URL) {
            settings.awesomeapi_url = url;
        }
        if let Some(url) = get(ENV_BCB_URL) {
            settings.bcb_url = url;
        }
        if let Some(url) = get(ENV_YAHOO_URL) {
            settings.yahoo_url = url;
        }
        if let Some(raw) = get(ENV_CACHE_MAX_AGE_HOURS) {
            let hours: u64 = raw
                .parse()
                .map_err(|_| AppError::input(format!("{ENV_CACHE_MAX_AGE_HOURS} must be a whole number of hours, got '{raw}'.")))?;
            settings.cache_policy = CachePolicy::RefreshIfOlderThan(hours_to_duration(hours));
        }
        Ok(settings)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn fuel_input_dir(&self) -> PathBuf {
        self.raw_dir().join("combustiveis")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn macro_output_path(&self) -> PathBuf {
        self.processed_dir().join(MACRO_OUTPUT_FILE)
    }

    pub fn fuel_output_path(&self) -> PathBuf {
        self.processed_dir().join(FUEL_OUTPUT_FILE)
    }

    /// Create every directory of the layout.
    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [
            self.raw_dir(),
            self.fuel_input_dir(),
            self.processed_dir(),
            self.log_dir(),
            self.models_dir(),
        ] {
            create_dir(&dir)?;
        }
        Ok(())
    }
}

pub fn hours_to_duration(hours: u64) -> Duration {
    Duration::from_secs(hours.saturating_mul(3600))
}

fn create_dir(dir: &Path) -> Result<(), AppError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| AppError::input(format!("Failed to create directory '{}': {e}", dir.display())))
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}
