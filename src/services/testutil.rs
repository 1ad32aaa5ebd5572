//! Series builders shared by the service unit tests.

use chrono::{Duration, NaiveDate};

use crate::services::normalizer::{derive_benchmark, derive_weekly, SeriesProfile};
use crate::types::{BenchmarkSeries, WeeklyPoint, WeeklySeries};

/// `n` consecutive Fridays starting 2020-01-03.
pub fn fridays(n: usize) -> Vec<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();
    (0..n).map(|i| first + Duration::days(7 * i as i64)).collect()
}

pub fn linear(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn points(closes: &[f64], volumes: Option<&[f64]>) -> Vec<WeeklyPoint> {
    fridays(closes.len())
        .into_iter()
        .enumerate()
        .map(|(i, date)| WeeklyPoint {
            date,
            close: closes[i],
            volume: volumes.map(|v| v[i]),
        })
        .collect()
}

pub fn fund_series(closes: &[f64]) -> WeeklySeries {
    derive_weekly(&points(closes, None), SeriesProfile::Fund)
}

pub fn equity_series(closes: &[f64], volumes: Option<&[f64]>) -> WeeklySeries {
    derive_weekly(&points(closes, volumes), SeriesProfile::Equity)
}

pub fn benchmark(closes: &[f64]) -> BenchmarkSeries {
    derive_benchmark(&points(closes, None))
}
