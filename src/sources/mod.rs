//! Market data sources.
//!
//! Every source hands back raw daily records in its own column schema; the
//! normalizer maps them onto the canonical weekly series.

pub mod eastmoney;
pub mod fallback;
pub mod memory;
pub mod yahoo;

pub use eastmoney::EastMoneyClient;
pub use fallback::FallbackSource;
pub use memory::StaticSource;
pub use yahoo::YahooFinanceClient;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::error::SourceError;
use crate::types::{InstrumentInfo, InstrumentKind, RawSeries};

/// A request for daily history of one instrument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesRequest {
    pub kind: InstrumentKind,
    pub code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeriesRequest {
    pub fn new(kind: InstrumentKind, code: &str, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            kind,
            code: code.to_string(),
            start,
            end,
        }
    }

    /// `years` of history ending on `end`.
    pub fn years_back(kind: InstrumentKind, code: &str, years: u32, end: NaiveDate) -> Self {
        Self::new(kind, code, history_start(end, years), end)
    }
}

/// Longest history window any request may ask for.
pub const MAX_HISTORY_YEARS: u32 = 50;

/// First day of a `years`-long window ending on `end`, as 365-day years.
///
/// `years` is capped at [`MAX_HISTORY_YEARS`]; the result never underflows.
pub fn history_start(end: NaiveDate, years: u32) -> NaiveDate {
    let days = 365 * i64::from(years.min(MAX_HISTORY_YEARS));
    end.checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Shanghai index codes whose bare form collides with the Shenzhen `000` range.
const SH_INDEX_CODES: &[&str] = &[
    "000001", "000002", "000003", "000010", "000016", "000300", "000688", "000852", "000903",
    "000904", "000905", "000906", "000985",
];

/// Split a code into its bare digits and whether it trades in Shanghai.
///
/// `sh`/`sz` prefixes win. Otherwise bare codes starting with 6 or 9 are
/// Shanghai, and an index code in the known Shanghai list is too; `000001` is
/// the SSE Composite as an index but Ping An Bank (Shenzhen) as an equity.
pub fn exchange_of(kind: InstrumentKind, code: &str) -> (String, bool) {
    let lower = code.trim().to_ascii_lowercase();
    if let Some(bare) = lower.strip_prefix("sh") {
        return (bare.to_string(), true);
    }
    if let Some(bare) = lower.strip_prefix("sz") {
        return (bare.to_string(), false);
    }
    let shanghai = lower.starts_with('6')
        || lower.starts_with('9')
        || (kind == InstrumentKind::Index && SH_INDEX_CODES.contains(&lower.as_str()));
    (lower, shanghai)
}

/// A provider of raw daily series and instrument identity.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Daily history for the requested window.
    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError>;

    /// Identity details (name, type, manager...).
    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError>;
}

#[async_trait]
impl<S: MarketDataSource + ?Sized> MarketDataSource for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        (**self).fetch_daily(request).await
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        (**self).fetch_info(kind, code).await
    }
}

#[async_trait]
impl<S: MarketDataSource + ?Sized> MarketDataSource for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        (**self).fetch_daily(request).await
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        (**self).fetch_info(kind, code).await
    }
}

/// Run `op` up to `attempts` times, sleeping 500ms × attempt between
/// transient failures.
pub(crate) async fn with_retries<T, F, Fut>(
    attempts: u32,
    label: &str,
    mut op: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_transient() => {
                warn!("{} failed (attempt {}/{}): {}", label, attempt, attempts, e);
                tokio::time::sleep(std::time::Duration::from_millis(500 * u64::from(attempt))).await;
            }
            Err(e) => return Err(e),
        }
    }
}
