//! Source adapter seam and the cache-aware fetch around it.

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{info, warn};

use crate::data::cache::LocalCache;
use crate::domain::DateWindow;
use crate::series::MacroFrame;

/// What an adapter got from upstream this run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFetch {
    pub frame: MacroFrame,
    /// `false` when any request behind the frame gave up after retries.
    pub complete: bool,
}

impl SourceFetch {
    pub fn complete(frame: MacroFrame) -> Self {
        Self { frame, complete: true }
    }

    pub fn partial(frame: MacroFrame) -> Self {
        Self { frame, complete: false }
    }
}

/// One upstream provider turned into date-indexed columns.
///
/// `fetch` never fails: an exhausted retry budget yields an empty (or
/// partial) frame that still carries the adapter's column names, flagged
/// incomplete.
pub trait SourceAdapter {
    fn name(&self) -> &'static str;

    /// Cache key derived from the source and its query parameters.
    fn cache_key(&self, window: &DateWindow) -> String;

    fn fetch(&self, window: &DateWindow) -> SourceFetch;
}

/// Serve `adapter` from the cache, or fetch and cache the result.
///
/// A cache hit skips the network entirely. Only complete, non-empty results
/// are cached; anything else is used for this run and fetched again next
/// time.
pub fn load_or_fetch(adapter: &dyn SourceAdapter, cache: &LocalCache, window: &DateWindow) -> MacroFrame {
    let key = adapter.cache_key(window);
    if let Some(frame) = cache.load(&key) {
        return frame;
    }

    info!(source = adapter.name(), %key, "Fetching from upstream");
    let SourceFetch { frame, complete } = adapter.fetch(window);
    if frame.is_empty() {
        warn!(source = adapter.name(), "No data available this run");
        return frame;
    }
    if !complete {
        warn!(source = adapter.name(), rows = frame.len(), "Partial data this run; not cached");
        return frame;
    }

    if let Err(e) = cache.save(&key, &frame) {
        warn!(source = adapter.name(), "Could not cache fetched data: {e}");
    }
    frame
}

/// Numbers arrive either as JSON numbers or as numeric strings.
pub(crate) fn json_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

pub(crate) fn json_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Unix seconds to a UTC calendar date.
pub(crate) fn unix_date(secs: i64) -> Option<NaiveDate> {
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}
