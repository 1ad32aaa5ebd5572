//! Request boundary for equity and fund analysis.
//!
//! Fetches the instrument, benchmark and identity concurrently, then runs the
//! pure pipeline on a blocking worker. Every failure ends up as an
//! [`ErrorPayload`]; nothing escapes as a panic.

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{AnalysisConfig, Config};
use crate::error::{AnalysisError, SourceError};
use crate::services::advice::{equity_advice, fund_advice};
use crate::services::breakout::{self, stop_loss};
use crate::services::normalizer::{normalize, normalize_benchmark, NormalizeOptions, SeriesProfile};
use crate::services::relative_strength::{evaluate, simple_relative_strength};
use crate::services::risk;
use crate::services::stage::{classify_equity_stage, classify_fund_stage};
use crate::sources::{MarketDataSource, SeriesRequest};
use crate::types::{
    AnalysisOutcome, BenchmarkSeries, EquityReport, EquitySnapshot, ErrorPayload, FundReport,
    FundSnapshot, InstrumentInfo, InstrumentKind, RawSeries, WeeklySeries,
};

/// Analyzes instruments from one data source.
pub struct Analyzer<S> {
    source: S,
    config: Config,
    as_of: Option<NaiveDate>,
}

impl<S: MarketDataSource> Analyzer<S> {
    pub fn new(source: S, config: Config) -> Self {
        Self {
            source,
            config,
            as_of: None,
        }
    }

    /// Pin the analysis date instead of using today's date.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    fn as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Analyze an equity against the configured benchmark.
    pub async fn analyze_equity(&self, code: &str) -> AnalysisOutcome<EquityReport> {
        into_outcome(code, self.try_analyze_equity(code).await)
    }

    /// Analyze a fund against `benchmark`, or the configured index when absent.
    pub async fn analyze_fund(&self, code: &str, benchmark: Option<&str>) -> AnalysisOutcome<FundReport> {
        into_outcome(code, self.try_analyze_fund(code, benchmark).await)
    }

    pub async fn try_analyze_equity(&self, code: &str) -> Result<EquityReport, AnalysisError> {
        let as_of = self.as_of();
        let benchmark_code = self.config.benchmark_index.clone();
        let instrument = SeriesRequest::years_back(InstrumentKind::Equity, code, self.config.equity_years, as_of);
        let benchmark = SeriesRequest::years_back(
            InstrumentKind::Index,
            &benchmark_code,
            self.config.index_years,
            as_of,
        );

        let (raw, raw_benchmark, info) = tokio::join!(
            self.source.fetch_daily(&instrument),
            self.source.fetch_daily(&benchmark),
            self.source.fetch_info(InstrumentKind::Equity, code),
        );

        let raw = raw.map_err(|e| {
            warn!("Equity {} unavailable from {}: {}", code, self.source.name(), e);
            AnalysisError::DataUnavailable
        })?;
        let raw_benchmark = raw_benchmark.unwrap_or_else(|e| {
            warn!(
                "Benchmark {} unavailable, relative strength defaults to 0: {}",
                benchmark_code, e
            );
            RawSeries::default()
        });
        let info = info_or_bare(info, code);

        let analysis = self.config.analysis.clone();
        let equity_options = NormalizeOptions::new(self.config.equity_years, as_of);
        let index_options = NormalizeOptions::new(self.config.index_years, as_of);
        let code = code.to_string();

        let report = run_blocking(move || {
            let series = normalize(&raw, SeriesProfile::Equity, equity_options);
            let benchmark = normalize_benchmark(&raw_benchmark, index_options);
            build_equity_report(&code, info, &series, &benchmark, &analysis)
        })
        .await?;

        info!(
            "Analyzed equity {}: stage {}, {} ({})",
            report.code, report.stage.stage, report.advice.action, report.advice.score
        );
        Ok(report)
    }

    pub async fn try_analyze_fund(
        &self,
        code: &str,
        benchmark: Option<&str>,
    ) -> Result<FundReport, AnalysisError> {
        let as_of = self.as_of();
        let benchmark_code = benchmark
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(&self.config.benchmark_index)
            .to_string();
        let instrument = SeriesRequest::years_back(InstrumentKind::Fund, code, self.config.fund_years, as_of);
        let benchmark = SeriesRequest::years_back(
            InstrumentKind::Index,
            &benchmark_code,
            self.config.index_years,
            as_of,
        );

        let (raw, raw_benchmark, info) = tokio::join!(
            self.source.fetch_daily(&instrument),
            self.source.fetch_daily(&benchmark),
            self.source.fetch_info(InstrumentKind::Fund, code),
        );

        let raw = raw.map_err(|e| {
            warn!("Fund {} unavailable from {}: {}", code, self.source.name(), e);
            AnalysisError::DataUnavailable
        })?;
        let raw_benchmark = raw_benchmark.map_err(|e| {
            warn!("Benchmark {} unavailable from {}: {}", benchmark_code, self.source.name(), e);
            AnalysisError::BenchmarkUnavailable
        })?;
        let info = info_or_bare(info, code);

        let analysis = self.config.analysis.clone();
        let fund_options = NormalizeOptions::new(self.config.fund_years, as_of);
        let index_options = NormalizeOptions::new(self.config.index_years, as_of);
        let code = code.to_string();

        let report = run_blocking(move || {
            let series = normalize(&raw, SeriesProfile::Fund, fund_options);
            let benchmark = normalize_benchmark(&raw_benchmark, index_options);
            build_fund_report(&code, &benchmark_code, info, &series, &benchmark, &analysis)
        })
        .await?;

        info!(
            "Analyzed fund {} vs {}: stage {} ({:.2}), {} ({})",
            report.code,
            report.benchmark,
            report.stage.stage,
            report.stage.confidence,
            report.advice.action,
            report.advice.score
        );
        Ok(report)
    }
}

fn into_outcome<T>(code: &str, result: Result<T, AnalysisError>) -> AnalysisOutcome<T> {
    match result {
        Ok(report) => AnalysisOutcome::Report(report),
        Err(e) => {
            warn!("Analysis of {} failed: {}", code, e);
            AnalysisOutcome::Failed(ErrorPayload::new(code, &e))
        }
    }
}

fn info_or_bare(info: Result<InstrumentInfo, SourceError>, code: &str) -> InstrumentInfo {
    info.unwrap_or_else(|e| {
        debug!("No identity data for {}: {}", code, e);
        InstrumentInfo::bare(code)
    })
}

/// Run the pipeline on the blocking pool; a panic becomes an internal error.
async fn run_blocking<T, F>(task: F) -> Result<T, AnalysisError>
where
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => {
            error!("Analysis task panicked");
            Err(AnalysisError::Internal("analysis task panicked".to_string()))
        }
        Err(e) => Err(AnalysisError::Internal(e.to_string())),
    }
}

/// Assemble an equity report from normalized series.
///
/// A missing benchmark leaves relative strength at 0.
pub fn build_equity_report(
    code: &str,
    info: InstrumentInfo,
    series: &WeeklySeries,
    benchmark: &BenchmarkSeries,
    config: &AnalysisConfig,
) -> Result<EquityReport, AnalysisError> {
    let latest = *series.latest().ok_or(AnalysisError::DataUnavailable)?;

    let stage = classify_equity_stage(series, config);
    let relative_strength = if benchmark.is_empty() {
        0.0
    } else {
        simple_relative_strength(series, benchmark, config.rs_lookback)
    };
    let risk = risk::assess(series, config.risk_free_rate, config.min_risk_rows);
    let signal = breakout::detect(series, config);
    let advice = equity_advice(&stage, relative_strength, &signal, config.rs_dead_zone);

    Ok(EquityReport {
        code: code.to_string(),
        info,
        analyzed_at: Utc::now(),
        latest: EquitySnapshot {
            date: latest.date,
            close: latest.close,
            ma30: latest.ma30,
            support: latest.support,
            resistance: latest.resistance,
            stop_loss: latest.support.map(stop_loss),
        },
        stage,
        relative_strength,
        risk,
        breakout: signal,
        advice,
    })
}

/// Assemble a fund report from normalized series.
pub fn build_fund_report(
    code: &str,
    benchmark_code: &str,
    info: InstrumentInfo,
    series: &WeeklySeries,
    benchmark: &BenchmarkSeries,
    config: &AnalysisConfig,
) -> Result<FundReport, AnalysisError> {
    let latest = *series.latest().ok_or(AnalysisError::DataUnavailable)?;
    if benchmark.is_empty() {
        return Err(AnalysisError::BenchmarkUnavailable);
    }

    let stage = classify_fund_stage(series, config);
    let relative_strength = evaluate(
        series,
        benchmark,
        &config.fund_lookbacks,
        config.risk_adjusted_window,
    );
    let risk = risk::assess(series, config.risk_free_rate, config.min_risk_rows);
    let advice = fund_advice(&stage, &relative_strength, &risk);

    Ok(FundReport {
        code: code.to_string(),
        benchmark: benchmark_code.to_string(),
        info,
        analyzed_at: Utc::now(),
        latest: FundSnapshot {
            nav_date: latest.date,
            nav: latest.close,
            ma30: latest.ma30,
            max_drawdown: risk.max_drawdown,
            downside_vol: risk.downside_vol,
            sharpe: risk.sharpe,
        },
        stage,
        relative_strength,
        risk,
        advice,
    })
}
