//! Raw daily series to normalized weekly series.
//!
//! Vendors name their columns differently, so column selection goes through
//! explicit schema adapters tried in order. The selected columns are coerced
//! to numbers, filtered to the requested window, resampled to weeks ending
//! Friday and enriched with moving averages, returns, rolling volatility and
//! (for equities) rolling support/resistance.

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::Value;
use tracing::debug;

use crate::services::stats::{mean, sample_std};
use crate::sources::history_start;
use crate::types::{
    BenchmarkBar, BenchmarkSeries, RawSeries, WeeklyBar, WeeklyPoint, WeeklySeries,
};

/// Rolling window of the volatility column (weeks of returns).
pub const VOL_WINDOW: usize = 20;
/// Rolling window of the support/resistance columns.
pub const LEVEL_WINDOW: usize = 20;
/// Longest moving average; rows before it is defined are dropped.
pub const MAX_MA_WINDOW: usize = 30;

/// Maps a vendor's column names onto the canonical date/price/volume set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaAdapter {
    pub name: &'static str,
    pub date_column: &'static str,
    pub price_column: &'static str,
    pub volume_column: Option<&'static str>,
}

impl SchemaAdapter {
    /// Whether the raw series carries this adapter's date and price columns.
    pub fn matches(&self, raw: &RawSeries) -> bool {
        raw.has_column(self.date_column) && raw.has_column(self.price_column)
    }
}

/// Exchange kline export (Chinese column names).
pub const PRIMARY: SchemaAdapter = SchemaAdapter {
    name: "primary",
    date_column: "日期",
    price_column: "收盘",
    volume_column: Some("成交量"),
};

/// Fund NAV history export.
pub const FUND_NAV: SchemaAdapter = SchemaAdapter {
    name: "fund-nav",
    date_column: "净值日期",
    price_column: "单位净值",
    volume_column: None,
};

/// Alternate vendor schema (English column names).
pub const FALLBACK: SchemaAdapter = SchemaAdapter {
    name: "fallback",
    date_column: "date",
    price_column: "close",
    volume_column: Some("volume"),
};

/// Which derived columns a weekly series declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesProfile {
    /// NAV series: moving averages, returns, volatility.
    Fund,
    /// Price series: as fund plus volume and support/resistance.
    Equity,
}

impl SeriesProfile {
    /// Adapters in the order they are tried.
    pub fn adapters(&self) -> &'static [SchemaAdapter] {
        match self {
            SeriesProfile::Fund => &[FUND_NAV, PRIMARY, FALLBACK],
            SeriesProfile::Equity => &[PRIMARY, FALLBACK],
        }
    }

    fn keeps_volume(&self) -> bool {
        matches!(self, SeriesProfile::Equity)
    }

    fn has_levels(&self) -> bool {
        matches!(self, SeriesProfile::Equity)
    }
}

/// Adapters tried for benchmark index series.
pub const BENCHMARK_ADAPTERS: &[SchemaAdapter] = &[PRIMARY, FALLBACK];

/// Date window applied before resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Years of history kept, counted back from `as_of`.
    pub years: u32,
    /// Last date kept (inclusive).
    pub as_of: NaiveDate,
}

impl NormalizeOptions {
    pub fn new(years: u32, as_of: NaiveDate) -> Self {
        Self { years, as_of }
    }

    pub fn start(&self) -> NaiveDate {
        history_start(self.as_of, self.years)
    }
}

/// A coerced daily observation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DailyObservation {
    date: NaiveDate,
    close: f64,
    volume: Option<f64>,
}

/// Normalize an instrument's raw daily series.
///
/// Returns an empty series when no adapter matches, no row survives
/// coercion, or the history never reaches the longest window.
pub fn normalize(raw: &RawSeries, profile: SeriesProfile, options: NormalizeOptions) -> WeeklySeries {
    let Some(adapter) = select_adapter(raw, profile.adapters()) else {
        debug!("No schema adapter matches {} raw rows", raw.len());
        return WeeklySeries::empty();
    };

    let daily = extract_daily(raw, adapter, profile.keeps_volume(), options);
    let weekly = resample_weekly(&daily);
    let series = derive_weekly(&weekly, profile);

    debug!(
        "Normalized {} raw rows via {} schema: {} daily, {} weekly, {} complete",
        raw.len(),
        adapter.name,
        daily.len(),
        weekly.len(),
        series.len()
    );

    series
}

/// Normalize a benchmark index's raw daily series.
pub fn normalize_benchmark(raw: &RawSeries, options: NormalizeOptions) -> BenchmarkSeries {
    let Some(adapter) = select_adapter(raw, BENCHMARK_ADAPTERS) else {
        debug!("No schema adapter matches benchmark with {} raw rows", raw.len());
        return BenchmarkSeries::default();
    };

    let daily = extract_daily(raw, adapter, false, options);
    derive_benchmark(&resample_weekly(&daily))
}

/// First adapter whose columns are present.
pub fn select_adapter<'a>(raw: &RawSeries, adapters: &'a [SchemaAdapter]) -> Option<&'a SchemaAdapter> {
    adapters.iter().find(|adapter| adapter.matches(raw))
}

fn extract_daily(
    raw: &RawSeries,
    adapter: &SchemaAdapter,
    keep_volume: bool,
    options: NormalizeOptions,
) -> Vec<DailyObservation> {
    let volume_column = adapter
        .volume_column
        .filter(|column| keep_volume && raw.has_column(column));
    let (start, end) = (options.start(), options.as_of);

    let mut daily: Vec<DailyObservation> = raw
        .records
        .iter()
        .filter_map(|record| {
            let date = record.get(adapter.date_column).and_then(parse_date)?;
            let close = record
                .get(adapter.price_column)
                .and_then(parse_number)
                .filter(|c| *c > 0.0)?;
            // A missing or malformed volume keeps the row; only the price is required.
            let volume = volume_column.and_then(|column| {
                record
                    .get(column)
                    .and_then(parse_number)
                    .filter(|v| *v >= 0.0)
            });
            Some(DailyObservation { date, close, volume })
        })
        .filter(|obs| obs.date >= start && obs.date <= end)
        .collect();

    daily.sort_by_key(|obs| obs.date);
    daily
}

/// The Friday closing the week that contains `date`.
///
/// Saturday and Sunday roll into the following Friday.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    let weekday = i64::from(date.weekday().num_days_from_monday());
    date + Duration::days((4 - weekday).rem_euclid(7))
}

/// Keep the last close of each Friday-anchored week, and the last volume
/// reported within that week.
fn resample_weekly(daily: &[DailyObservation]) -> Vec<WeeklyPoint> {
    let mut weekly: Vec<WeeklyPoint> = Vec::new();
    for obs in daily {
        let week_end = week_ending_friday(obs.date);
        match weekly.last_mut() {
            Some(last) if last.date == week_end => {
                last.close = obs.close;
                last.volume = obs.volume.or(last.volume);
            }
            _ => weekly.push(WeeklyPoint {
                date: week_end,
                close: obs.close,
                volume: obs.volume,
            }),
        }
    }
    weekly
}

fn rolling_mean(closes: &[f64], end: usize, window: usize) -> Option<f64> {
    if end + 1 < window {
        return None;
    }
    mean(&closes[end + 1 - window..=end])
}

/// Derive the weekly columns and drop rows lacking trailing history.
pub fn derive_weekly(points: &[WeeklyPoint], profile: SeriesProfile) -> WeeklySeries {
    let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
    let returns: Vec<Option<f64>> = (0..closes.len())
        .map(|i| (i > 0).then(|| closes[i] / closes[i - 1] - 1.0))
        .collect();

    let bars = points
        .iter()
        .enumerate()
        .filter_map(|(i, point)| {
            let ret = returns[i]?;
            let ma10 = rolling_mean(&closes, i, 10)?;
            let ma20 = rolling_mean(&closes, i, 20)?;
            let ma30 = rolling_mean(&closes, i, MAX_MA_WINDOW)?;

            if i < VOL_WINDOW {
                return None;
            }
            let window: Vec<f64> = returns[i + 1 - VOL_WINDOW..=i]
                .iter()
                .copied()
                .collect::<Option<Vec<f64>>>()?;
            let vol = sample_std(&window)?;

            let (support, resistance) = if profile.has_levels() {
                let levels = &closes[i + 1 - LEVEL_WINDOW..=i];
                (
                    levels.iter().copied().reduce(f64::min),
                    levels.iter().copied().reduce(f64::max),
                )
            } else {
                (None, None)
            };

            Some(WeeklyBar {
                date: point.date,
                close: point.close,
                volume: if profile.keeps_volume() { point.volume } else { None },
                ma10,
                ma20,
                ma30,
                ret,
                log_ret: (closes[i] / closes[i - 1]).ln(),
                vol,
                support,
                resistance,
            })
        })
        .collect();

    WeeklySeries::from_bars(bars)
}

/// Derive benchmark returns; only the first week is dropped.
pub fn derive_benchmark(points: &[WeeklyPoint]) -> BenchmarkSeries {
    let bars = points
        .windows(2)
        .map(|pair| BenchmarkBar {
            date: pair[1].date,
            close: pair[1].close,
            ret: pair[1].close / pair[0].close - 1.0,
            log_ret: (pair[1].close / pair[0].close).ln(),
        })
        .collect();
    BenchmarkSeries::from_bars(bars)
}

/// Parse a vendor date cell.
///
/// Accepts `YYYY-MM-DD`, `YYYYMMDD`, `YYYY/MM/DD` with an optional time part,
/// an 8-digit integer, or epoch milliseconds.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            let day = s.split([' ', 'T']).next().unwrap_or(s);
            ["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        }
        Value::Number(n) => {
            let n = n.as_i64()?;
            if (10_000_000..100_000_000).contains(&n) {
                NaiveDate::parse_from_str(&n.to_string(), "%Y%m%d").ok()
            } else {
                chrono::DateTime::from_timestamp_millis(n).map(|dt| dt.date_naive())
            }
        }
        _ => None,
    }
}

/// Coerce a vendor numeric cell; non-numeric or non-finite values fail.
pub fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
