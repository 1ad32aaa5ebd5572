//! Raw-series fixtures shared by the integration tests.

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use serde_json::{json, Value};
use stagewise::config::Config;
use stagewise::services::Analyzer;
use stagewise::sources::StaticSource;
use stagewise::{InstrumentKind, RawRecord, RawSeries};

/// Friday all fixtures end on.
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

/// `n` consecutive Fridays ending on [`as_of`].
pub fn fridays(n: usize) -> Vec<NaiveDate> {
    (0..n)
        .map(|i| as_of() - Duration::days(7 * (n - 1 - i) as i64))
        .collect()
}

pub fn linear(start: f64, step: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start + step * i as f64).collect()
}

pub fn geometric(start: f64, factor: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| start * factor.powi(i as i32)).collect()
}

fn records(rows: Vec<Value>) -> RawSeries {
    RawSeries::new(
        rows.into_iter()
            .filter_map(|row| row.as_object().cloned())
            .collect::<Vec<RawRecord>>(),
    )
}

/// Fund NAV history in the vendor's Chinese schema.
pub fn fund_nav_raw(navs: &[f64]) -> RawSeries {
    records(
        fridays(navs.len())
            .into_iter()
            .zip(navs)
            .map(|(date, nav)| {
                json!({
                    "净值日期": date.format("%Y-%m-%d").to_string(),
                    "单位净值": nav,
                    "累计净值": nav,
                })
            })
            .collect(),
    )
}

/// Index klines in the vendor's Chinese schema.
pub fn index_raw(closes: &[f64]) -> RawSeries {
    records(
        fridays(closes.len())
            .into_iter()
            .zip(closes)
            .map(|(date, close)| {
                json!({
                    "日期": date.format("%Y-%m-%d").to_string(),
                    "收盘": close,
                    "成交量": 1_000_000,
                })
            })
            .collect(),
    )
}

/// Equity history in the English schema.
pub fn equity_raw(closes: &[f64], volumes: &[f64]) -> RawSeries {
    records(
        fridays(closes.len())
            .into_iter()
            .zip(closes.iter().zip(volumes))
            .map(|(date, (close, volume))| {
                json!({
                    "date": date.format("%Y-%m-%d").to_string(),
                    "close": close,
                    "volume": volume,
                })
            })
            .collect(),
    )
}

/// A fund rising steadily against a benchmark losing 2.5% a week.
pub fn outperforming_fund_source(code: &str) -> StaticSource {
    StaticSource::new()
        .with_series(InstrumentKind::Fund, code, fund_nav_raw(&linear(0.71, 0.01, 100)))
        .with_series(
            InstrumentKind::Index,
            stagewise::config::DEFAULT_BENCHMARK,
            index_raw(&geometric(4000.0, 0.975, 100)),
        )
}

pub fn analyzer(source: StaticSource) -> Analyzer<StaticSource> {
    Analyzer::new(source, Config::default()).with_as_of(as_of())
}
