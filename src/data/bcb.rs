//! Central Bank of Brazil time-series (SGS) adapters.
//!
//! Inflation (IPCA) and the policy rate (Selic) share the same endpoint
//! shape: one request returns the full history as `{data, valor}` records,
//! which are parsed and then cut to the requested window.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::data::fetch::ResilientFetcher;
use crate::data::sources::{SourceAdapter, SourceFetch, json_f64};
use crate::domain::{DateWindow, MacroSeries, MacroVariable, RawObservation};
use crate::series::MacroFrame;

pub const DEFAULT_BASE_URL: &str = "https://api.bcb.gov.br";

/// IPCA, monthly variation.
pub const SERIES_INFLATION: u32 = 433;
/// Selic target rate.
pub const SERIES_POLICY_RATE: u32 = 432;

pub struct BcbSeriesAdapter {
    fetcher: ResilientFetcher,
    base_url: String,
    series_code: u32,
    variable: MacroVariable,
    name: &'static str,
    cache_key: &'static str,
}

impl BcbSeriesAdapter {
    pub fn inflation(fetcher: ResilientFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            series_code: SERIES_INFLATION,
            variable: MacroVariable::InflationIndex,
            name: "inflation",
            cache_key: "inflation_data",
        }
    }

    pub fn policy_rate(fetcher: ResilientFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            series_code: SERIES_POLICY_RATE,
            variable: MacroVariable::PolicyRate,
            name: "policy_rate",
            cache_key: "selic_data",
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/dados/serie/bcdata.sgs.{}/dados?formato=json",
            self.base_url, self.series_code
        )
    }
}

impl SourceAdapter for BcbSeriesAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn cache_key(&self, _window: &DateWindow) -> String {
        self.cache_key.to_string()
    }

    fn fetch(&self, window: &DateWindow) -> SourceFetch {
        let tag = self.variable.column();
        let Some(body) = self.fetcher.fetch(&self.url()) else {
            return SourceFetch::partial(MacroFrame::from_series(&MacroSeries::empty(tag)));
        };

        let (observations, dropped) = parse_sgs_records(&body, tag);
        if dropped > 0 {
            warn!(series = self.series_code, dropped, "Dropped unparseable SGS records");
        }

        let series = MacroSeries::new(tag, observations.into_iter().filter(|o| window.contains(o.timestamp)));
        info!(series = self.series_code, rows = series.len(), "SGS series fetched");
        SourceFetch::complete(MacroFrame::from_series(&series))
    }
}

fn parse_sgs_records(body: &Value, tag: &str) -> (Vec<RawObservation>, usize) {
    let Some(items) = body.as_array() else {
        return (Vec::new(), 0);
    };

    let mut out = Vec::with_capacity(items.len());
    let mut dropped = 0;
    for item in items {
        let date = item
            .get("data")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok());
        let value = item.get("valor").and_then(json_f64);
        match (date, value) {
            (Some(date), Some(value)) => out.push(RawObservation::new(date, value, tag)),
            _ => dropped += 1,
        }
    }
    (out, dropped)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::data::cache::{CachePolicy, LocalCache};
    use crate::data::fetch::testing::{ScriptedTransport, fetcher};
    use crate::data::sources::load_or_fetch;
    use crate::io::export::write_frame_csv;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn window() -> DateWindow {
        DateWindow::new(d(2019, 1, 1), d(2024, 12, 31))
    }

    fn ipca_body() -> Value {
        json!([
            {"data": "01/12/2018", "valor": "0.15"},
            {"data": "01/01/2019", "valor": "0.32"},
            {"data": "01/02/2019", "valor": "0.43"},
            {"data": "31/02/2019", "valor": "0.10"},
            {"data": "01/03/2019", "valor": ""}
        ])
    }

    #[test]
    fn filters_to_window_and_drops_bad_records() {
        let transport = Arc::new(ScriptedTransport::new().route("bcdata.sgs.433", vec![Ok(ipca_body())]));
        let adapter = BcbSeriesAdapter::inflation(fetcher(Arc::clone(&transport), 1), "https://bcb.test");

        let frame = adapter.fetch(&window()).frame;

        assert_eq!(
            transport.calls(),
            vec!["https://bcb.test/dados/serie/bcdata.sgs.433/dados?formato=json".to_string()]
        );
        assert_eq!(frame.columns(), &["inflation_index".to_string()]);
        assert_eq!(frame.dates().collect::<Vec<_>>(), vec![d(2019, 1, 1), d(2019, 2, 1)]);
    }

    #[test]
    fn policy_rate_uses_its_own_series_and_column() {
        let transport = Arc::new(ScriptedTransport::new().route(
            "bcdata.sgs.432",
            vec![Ok(json!([{"data": "02/01/2020", "valor": "4.50"}]))],
        ));
        let adapter = BcbSeriesAdapter::policy_rate(fetcher(Arc::clone(&transport), 1), "https://bcb.test");

        let frame = adapter.fetch(&window()).frame;
        assert_eq!(frame.value(d(2020, 1, 2), "policy_rate"), Some(4.5));
        assert_eq!(adapter.cache_key(&window()), "selic_data");
    }

    #[test]
    fn exhausted_retries_yield_an_empty_frame() {
        let transport = Arc::new(ScriptedTransport::new());
        let adapter = BcbSeriesAdapter::inflation(fetcher(Arc::clone(&transport), 3), "https://bcb.test");

        let frame = adapter.fetch(&window()).frame;
        assert!(frame.is_empty());
        assert_eq!(frame.columns(), &["inflation_index".to_string()]);
        assert_eq!(transport.calls().len(), 3);
    }

    #[test]
    fn cached_inflation_is_returned_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mut cached = MacroFrame::new(vec!["inflation_index".to_string()]);
        cached.insert_row(d(2020, 1, 1), vec![Some(0.21)]);
        write_frame_csv(&dir.path().join("inflation_data.csv"), &cached).unwrap();

        let transport = Arc::new(ScriptedTransport::new().route("bcdata.sgs.433", vec![Ok(ipca_body())]));
        let adapter = BcbSeriesAdapter::inflation(fetcher(Arc::clone(&transport), 1), "https://bcb.test");
        let cache = LocalCache::new(dir.path(), CachePolicy::AlwaysReuse);

        let frame = load_or_fetch(&adapter, &cache, &window());

        assert_eq!(frame, cached);
        assert!(transport.calls().is_empty());
    }
}
