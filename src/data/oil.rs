//! Brent and WTI daily prices from a market-data provider.
//!
//! Each ticker is fetched on its own with a longer retry pause (the chart
//! endpoint rate-limits aggressively) and normalized into a single column.
//! The two columns are then outer-joined, so a day missing from one ticker
//! keeps the other ticker's price.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use tracing::{info, warn};

use crate::data::fetch::ResilientFetcher;
use crate::data::sources::{SourceAdapter, SourceFetch, json_f64, unix_date};
use crate::domain::{DateWindow, MacroSeries, MacroVariable, RawObservation};
use crate::series::MacroFrame;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

pub const TICKER_BRENT: &str = "BZ=F";
pub const TICKER_WTI: &str = "CL=F";

/// Query interface for daily price history of one ticker.
pub trait MarketData {
    /// `None` when the provider gave nothing usable after retries.
    fn daily_history(&self, ticker: &str, window: &DateWindow) -> Option<Vec<(NaiveDate, f64)>>;
}

/// Yahoo Finance v8 chart endpoint.
pub struct YahooChart {
    fetcher: ResilientFetcher,
    base_url: String,
}

impl YahooChart {
    pub fn new(fetcher: ResilientFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, ticker: &str, window: &DateWindow) -> String {
        let period1 = window.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = window.end.and_time(NaiveTime::MIN).and_utc().timestamp();
        format!(
            "{}/v8/finance/chart/{ticker}?period1={period1}&period2={period2}&interval=1d&events=history",
            self.base_url
        )
    }
}

impl MarketData for YahooChart {
    fn daily_history(&self, ticker: &str, window: &DateWindow) -> Option<Vec<(NaiveDate, f64)>> {
        self.fetcher
            .fetch_parsed(&self.url(ticker, window), |json| parse_chart(json, ticker))
    }
}

/// Prefer adjusted close, fall back to close; null prices are skipped.
fn parse_chart(body: &Value, ticker: &str) -> Result<Vec<(NaiveDate, f64)>, String> {
    let chart = body.get("chart").ok_or_else(|| format!("No chart payload for {ticker}"))?;
    if let Some(err) = chart.get("error").filter(|e| !e.is_null()) {
        return Err(format!("Provider error for {ticker}: {err}"));
    }
    let result = chart
        .get("result")
        .and_then(|r| r.get(0))
        .ok_or_else(|| format!("No result for {ticker}"))?;

    let indicators = result.get("indicators");
    let prices = indicators
        .and_then(|i| i.pointer("/adjclose/0/adjclose"))
        .or_else(|| indicators.and_then(|i| i.pointer("/quote/0/close")))
        .and_then(Value::as_array)
        .ok_or_else(|| format!("Expected price columns not found for {ticker}"))?;

    let timestamps = result
        .get("timestamp")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    Ok(timestamps
        .iter()
        .zip(prices)
        .filter_map(|(ts, price)| {
            let date = ts.as_i64().and_then(unix_date)?;
            Some((date, json_f64(price)?))
        })
        .collect())
}

pub struct OilPriceAdapter {
    provider: Box<dyn MarketData>,
}

impl OilPriceAdapter {
    pub fn new(provider: Box<dyn MarketData>) -> Self {
        Self { provider }
    }

    /// Single-column frame for one ticker, and whether the fetch succeeded.
    fn ticker_frame(&self, ticker: &str, variable: MacroVariable, window: &DateWindow) -> (MacroFrame, bool) {
        let tag = variable.column();
        let (series, ok) = match self.provider.daily_history(ticker, window) {
            Some(points) => {
                info!(ticker, rows = points.len(), "Oil prices fetched");
                (
                    MacroSeries::new(tag, points.into_iter().map(|(d, v)| RawObservation::new(d, v, tag))),
                    true,
                )
            }
            None => {
                warn!(ticker, "No oil prices after retries; continuing without them");
                (MacroSeries::empty(tag), false)
            }
        };
        (MacroFrame::from_series(&series), ok)
    }
}

impl SourceAdapter for OilPriceAdapter {
    fn name(&self) -> &'static str {
        "oil_prices"
    }

    fn cache_key(&self, window: &DateWindow) -> String {
        format!("oil_prices_{}_{}", window.start.format("%Y%m%d"), window.end.format("%Y%m%d"))
    }

    fn fetch(&self, window: &DateWindow) -> SourceFetch {
        let (brent, brent_ok) = self.ticker_frame(TICKER_BRENT, MacroVariable::BrentPrice, window);
        let (wti, wti_ok) = self.ticker_frame(TICKER_WTI, MacroVariable::WtiPrice, window);
        let frame = brent.outer_join(&wti);
        if brent_ok && wti_ok {
            SourceFetch::complete(frame)
        } else {
            SourceFetch::partial(frame)
        }
    }
}
