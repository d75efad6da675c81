//! Daily exchange rates against BRL from the AwesomeAPI currency service.
//!
//! The service windows its daily endpoint, so the adapter issues one request
//! per calendar year in range and concatenates whatever comes back.

use chrono::Datelike;
use serde_json::Value;
use tracing::{info, warn};

use crate::data::fetch::ResilientFetcher;
use crate::data::sources::{SourceAdapter, SourceFetch, json_f64, json_i64, unix_date};
use crate::domain::{DateWindow, MacroSeries, MacroVariable, RawObservation};
use crate::series::MacroFrame;

pub const DEFAULT_BASE_URL: &str = "https://economia.awesomeapi.com.br";

/// Upper bound on rows per yearly request.
const DAYS_PER_REQUEST: u32 = 365;

pub struct ExchangeRateAdapter {
    fetcher: ResilientFetcher,
    base_url: String,
    currency: String,
}

impl ExchangeRateAdapter {
    pub fn new(fetcher: ResilientFetcher, base_url: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            currency: currency.into().to_ascii_uppercase(),
        }
    }

    fn year_url(&self, year: i32) -> String {
        format!(
            "{}/json/daily/{}-BRL/{DAYS_PER_REQUEST}?start_date={year}0101&end_date={year}1231",
            self.base_url, self.currency
        )
    }
}

impl SourceAdapter for ExchangeRateAdapter {
    fn name(&self) -> &'static str {
        "exchange_rate"
    }

    fn cache_key(&self, window: &DateWindow) -> String {
        format!(
            "exchange_rate_{}_{}_{}",
            self.currency,
            window.start.year(),
            window.end.year()
        )
    }

    fn fetch(&self, window: &DateWindow) -> SourceFetch {
        let tag = MacroVariable::ExchangeRate.column();
        let mut observations = Vec::new();
        let mut dropped = 0usize;
        let mut failed_years = 0usize;

        for year in window.start.year()..=window.end.year() {
            let Some(body) = self.fetcher.fetch(&self.year_url(year)) else {
                warn!(currency = %self.currency, year, "No exchange rates for year");
                failed_years += 1;
                continue;
            };
            let (mut parsed, bad) = parse_daily_quotes(&body, tag);
            dropped += bad;
            observations.append(&mut parsed);
        }

        if dropped > 0 {
            warn!(currency = %self.currency, dropped, "Dropped unparseable exchange-rate records");
        }
        let series = MacroSeries::new(tag, observations);
        info!(currency = %self.currency, rows = series.len(), "Exchange rates fetched");
        let frame = MacroFrame::from_series(&series);
        if failed_years == 0 {
            SourceFetch::complete(frame)
        } else {
            SourceFetch::partial(frame)
        }
    }
}

/// Parse the daily quote list; returns observations and the count dropped.
fn parse_daily_quotes(body: &Value, tag: &str) -> (Vec<RawObservation>, usize) {
    let Some(items) = body.as_array() else {
        return (Vec::new(), 0);
    };

    let mut out = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        let date = item.get("timestamp").and_then(json_i64).and_then(unix_date);
        let bid = item.get("bid").and_then(json_f64);
        match (date, bid) {
            (Some(date), Some(bid)) => out.push(RawObservation::new(date, bid, tag)),
            _ => dropped += 1,
        }
    }
    (out, dropped)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::data::fetch::testing::{ScriptedTransport, fetcher, server_error};

    fn window(start_year: i32, end_year: i32) -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(start_year, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(end_year, 12, 31).unwrap(),
        )
    }

    #[test]
    fn one_request_per_year_concatenated() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route(
                    "start_date=20230101",
                    vec![Ok(json!([
                        {"bid": "4.8526", "timestamp": "1672704000"},
                        {"bid": "4.9000", "timestamp": "1672790400"}
                    ]))],
                )
                .route(
                    "start_date=20240101",
                    vec![Ok(json!([{"bid": "4.9", "timestamp": "1704153600"}]))],
                ),
        );
        let adapter = ExchangeRateAdapter::new(fetcher(Arc::clone(&transport), 2), "https://fx.test/", "usd");

        let frame = adapter.fetch(&window(2023, 2024)).frame;

        assert_eq!(transport.calls().len(), 2);
        assert!(transport.calls()[0].starts_with("https://fx.test/json/daily/USD-BRL/365?"));
        assert_eq!(frame.len(), 3);
        assert_eq!(
            frame.value(NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(), "exchange_rate"),
            Some(4.8526)
        );
    }

    #[test]
    fn failed_year_is_skipped_and_bad_records_dropped() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .route("start_date=20230101", vec![server_error("2023")])
                .route(
                    "start_date=20240101",
                    vec![Ok(json!([
                        {"bid": "4.9", "timestamp": "1704153600"},
                        {"bid": "oops", "timestamp": "1704240000"},
                        {"bid": "5.0"}
                    ]))],
                ),
        );
        let adapter = ExchangeRateAdapter::new(fetcher(Arc::clone(&transport), 3), "https://fx.test", "USD");

        let fetched = adapter.fetch(&window(2023, 2024));
        let frame = fetched.frame;

        assert!(!fetched.complete);
        assert_eq!(transport.calls_matching("start_date=20230101"), 3);
        assert_eq!(frame.len(), 1);
        assert_eq!(frame.columns(), &["exchange_rate".to_string()]);
    }

    #[test]
    fn cache_key_carries_currency_and_years() {
        let transport = Arc::new(ScriptedTransport::new());
        let adapter = ExchangeRateAdapter::new(fetcher(transport, 1), "https://fx.test", "usd");
        assert_eq!(adapter.cache_key(&window(2019, 2025)), "exchange_rate_USD_2019_2025");
    }
}
