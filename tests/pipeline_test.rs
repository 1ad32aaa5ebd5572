//! End-to-end analysis through the in-memory source.

mod common;

use chrono::Duration;
use common::*;
use stagewise::config::{AnalysisConfig, Config, DEFAULT_BENCHMARK};
use stagewise::services::advice::fund_advice;
use stagewise::services::normalizer::{derive_benchmark, derive_weekly, SeriesProfile};
use stagewise::services::relative_strength::evaluate;
use stagewise::services::risk;
use stagewise::services::Analyzer;
use stagewise::services::stage::classify_fund_stage;
use stagewise::sources::StaticSource;
use stagewise::{
    Action, AnalysisError, AnalysisOutcome, InstrumentInfo, InstrumentKind, RawSeries, Stage,
    WeeklyPoint,
};
use tokio_test::assert_ok;

fn weekly_points(closes: &[f64]) -> Vec<WeeklyPoint> {
    fridays(closes.len())
        .into_iter()
        .zip(closes)
        .map(|(date, &close)| WeeklyPoint {
            date,
            close,
            volume: None,
        })
        .collect()
}

// ============================================================================
// Fund scenarios
// ============================================================================

#[test]
fn test_forty_week_rise_is_advancing_with_buy_advice() {
    // 69 weekly NAVs leave 40 complete rows running from 1.00 to 1.40.
    let step = 0.4 / 39.0;
    let navs = linear(1.0 - 29.0 * step, step, 69);
    let series = derive_weekly(&weekly_points(&navs), SeriesProfile::Fund);
    assert_eq!(series.len(), 40);
    assert!((series.bars()[0].close - 1.0).abs() < 1e-9);
    assert!((series.latest().unwrap().close - 1.4).abs() < 1e-9);

    let config = AnalysisConfig::default();
    let stage = classify_fund_stage(&series, &config);
    assert_eq!(stage.stage, Stage::Advancing);
    assert_eq!(stage.confidence, 0.9);

    // 40 joined weeks never reach the 52-week lookback, so relative strength is zero.
    let benchmark = derive_benchmark(&weekly_points(&[3000.0; 69]));
    let rs = evaluate(&series, &benchmark, &config.fund_lookbacks, config.risk_adjusted_window);
    assert_eq!(rs.latest_rs, 0.0);

    let risk = risk::assess(&series, config.risk_free_rate, config.min_risk_rows);
    let advice = fund_advice(&stage, &rs, &risk);
    assert!(advice.action.is_buy());
    assert_eq!(advice.action, Action::LightBuy);
    assert_eq!(advice.score, 7.2);
    assert_eq!((advice.position.min, advice.position.max), (10, 30));
}

#[tokio::test]
async fn test_outperforming_fund_end_to_end() {
    let mut info = InstrumentInfo::bare("161725");
    info.name = Some("Liquor Index Fund".to_string());
    let source = outperforming_fund_source("161725").with_info(InstrumentKind::Fund, info);

    let report = assert_ok!(analyzer(source).try_analyze_fund("161725", None).await);

    assert_eq!(report.code, "161725");
    assert_eq!(report.benchmark, DEFAULT_BENCHMARK);
    assert_eq!(report.info.name.as_deref(), Some("Liquor Index Fund"));
    assert_eq!(report.latest.nav_date, as_of());
    assert!((report.latest.nav - 1.70).abs() < 1e-9);

    assert_eq!(report.stage.stage, Stage::Advancing);
    assert_eq!(report.stage.confidence, 0.9);

    let rs = &report.relative_strength;
    assert_eq!(rs.lookbacks.len(), 3);
    assert!(rs.latest_rs > 0.6);
    assert_eq!(rs.score("26w").unwrap().excess_return, rs.latest_rs);
    assert_eq!(rs.score("12w").unwrap().win_rate, 1.0);
    assert!(rs.risk_adjusted_rs > 0.0);

    assert_eq!(report.risk.max_drawdown, 0.0);
    assert!(report.risk.sharpe > 1.0);

    assert_eq!(report.advice.action, Action::StrongBuy);
    assert!(report.advice.score > 50.0);
    assert_eq!(report.advice.confidence, Some(90.0));
    assert!(report.advice.note.starts_with("advancing"));
}

#[tokio::test]
async fn test_fund_with_named_benchmark() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Fund, "110011", fund_nav_raw(&linear(0.71, 0.01, 100)))
        .with_series(InstrumentKind::Index, "sh000905", index_raw(&[5000.0; 100]));

    let report = assert_ok!(analyzer(source).try_analyze_fund("110011", Some("sh000905")).await);
    assert_eq!(report.benchmark, "sh000905");
    assert_eq!(report.info, InstrumentInfo::bare("110011"));
}

#[tokio::test]
async fn test_fund_without_benchmark_fails() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Fund, "161725", fund_nav_raw(&linear(0.71, 0.01, 100)));

    let outcome = analyzer(source).analyze_fund("161725", None).await;
    let payload = outcome.error().unwrap();
    assert_eq!(payload.error, "cannot retrieve benchmark data");
    assert_eq!(payload.code, "161725");
}

#[tokio::test]
async fn test_stale_history_outside_window_is_unavailable() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Fund, "161725", fund_nav_raw(&linear(1.0, 0.01, 100)))
        .with_series(InstrumentKind::Index, DEFAULT_BENCHMARK, index_raw(&[3000.0; 100]));

    // Every NAV predates the three-year window.
    let later = as_of() + Duration::days(365 * 5);
    let analyzer = Analyzer::new(source, Config::default()).with_as_of(later);
    let result = analyzer.try_analyze_fund("161725", None).await;
    assert!(matches!(result, Err(AnalysisError::DataUnavailable)));
}

// ============================================================================
// Equity scenarios
// ============================================================================

#[tokio::test]
async fn test_flat_equity_is_basing_hold() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Equity, "600519", equity_raw(&[10.0; 30], &[1000.0; 30]))
        .with_series(InstrumentKind::Index, DEFAULT_BENCHMARK, index_raw(&[3000.0; 30]));

    let report = assert_ok!(analyzer(source).try_analyze_equity("600519").await);

    assert_eq!(report.stage.stage, Stage::Basing);
    assert_eq!(report.relative_strength, 0.0);
    assert!(!report.breakout.breakout);
    assert!(!report.breakout.breakdown);
    assert_eq!(report.advice.action, Action::Hold);
    assert_eq!(report.advice.score, 60.0);
    assert!(report.advice.confidence.is_none());
    assert_eq!(report.latest.support, Some(10.0));
    assert_eq!(report.latest.stop_loss, Some(9.95));
}

#[tokio::test]
async fn test_volume_backed_breakout_is_buy() {
    let mut closes = linear(10.0, 0.1, 79);
    closes.push(closes[78] * 1.05);
    let mut volumes = vec![1000.0; 79];
    volumes.push(3000.0);

    let source = StaticSource::new()
        .with_series(InstrumentKind::Equity, "600519", equity_raw(&closes, &volumes))
        .with_series(InstrumentKind::Index, DEFAULT_BENCHMARK, index_raw(&[3000.0; 80]));

    let report = assert_ok!(analyzer(source).try_analyze_equity("600519").await);

    assert_eq!(report.stage.stage, Stage::Advancing);
    assert!(report.relative_strength > 0.005);
    assert!(report.breakout.breakout);
    assert!(report.breakout.volume_confirmed);
    assert_eq!(report.advice.action, Action::Buy);
    assert_eq!(report.advice.score, 85.0);
}

#[tokio::test]
async fn test_equity_without_benchmark_still_reports() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Equity, "600519", equity_raw(&[10.0; 40], &[1000.0; 40]));

    let report = assert_ok!(analyzer(source).try_analyze_equity("600519").await);
    assert_eq!(report.relative_strength, 0.0);
}

#[tokio::test]
async fn test_empty_equity_yields_error_payload() {
    let source = StaticSource::new()
        .with_series(InstrumentKind::Equity, "000001", RawSeries::default())
        .with_series(InstrumentKind::Index, DEFAULT_BENCHMARK, index_raw(&[3000.0; 40]));

    let outcome = analyzer(source).analyze_equity("000001").await;
    assert!(!outcome.is_report());

    let json = serde_json::to_value(&outcome).unwrap();
    assert_eq!(json["error"], "cannot retrieve instrument data");
    assert_eq!(json["code"], "000001");
}

#[tokio::test]
async fn test_unknown_equity_yields_error_payload() {
    let outcome = analyzer(StaticSource::new()).analyze_equity("999999").await;
    match outcome {
        AnalysisOutcome::Failed(payload) => assert_eq!(payload.code, "999999"),
        AnalysisOutcome::Report(_) => panic!("expected an error payload"),
    }
}
