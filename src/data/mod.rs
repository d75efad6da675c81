//! Upstream macro data: resilient fetching, local caching, and one adapter
//! per provider.
//!
//! - `fetch`: retrying JSON GETs behind a `Transport` seam
//! - `cache`: per-source CSV cache with an explicit reuse policy
//! - `sources`: the `SourceAdapter` trait and cache-aware fetch
//! - `exchange`, `bcb`, `oil`: the concrete providers

pub mod bcb;
pub mod cache;
pub mod exchange;
pub mod fetch;
pub mod oil;
pub mod sources;

pub use cache::{CachePolicy, LocalCache};
pub use fetch::{FetchError, FixedDelay, HttpTransport, ResilientFetcher, RetryStrategy, Transport};
pub use sources::{SourceAdapter, SourceFetch, load_or_fetch};
