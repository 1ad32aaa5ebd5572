use std::env;

use crate::sources::MAX_HISTORY_YEARS;

/// Default benchmark index (CSI 300).
pub const DEFAULT_BENCHMARK: &str = "sh000300";

/// Tunable thresholds for the analysis pipeline.
///
/// The defaults are rule-of-thumb values, not fit to data.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// Weeks used by the simple (equity) relative-strength score.
    pub rs_lookback: usize,
    /// Lookback windows in weeks for the enhanced (fund) relative strength.
    pub fund_lookbacks: Vec<usize>,
    /// Cap on the window used for the risk-adjusted relative strength.
    pub risk_adjusted_window: usize,
    /// Dead zone separating "near zero" from meaningful relative strength.
    pub rs_dead_zone: f64,
    /// Trailing weeks forming the breakout high-water mark.
    pub breakout_lookback: usize,
    /// Fraction the latest close must clear the trailing high by.
    pub breakout_threshold: f64,
    /// Trailing weeks averaged for volume confirmation.
    pub volume_window: usize,
    /// Multiple of average volume that confirms a breakout.
    pub volume_multiplier: f64,
    /// Annualized risk-free rate for the Sharpe-like ratio.
    pub risk_free_rate: f64,
    /// Number of moving-average points fitted for slope and R².
    pub slope_window: usize,
    /// Minimum weekly rows before the stage classifier will run.
    pub min_stage_rows: usize,
    /// Minimum weekly rows before risk figures are computed.
    pub min_risk_rows: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rs_lookback: 12,
            fund_lookbacks: vec![12, 26, 52],
            risk_adjusted_window: 52,
            rs_dead_zone: 0.005,
            breakout_lookback: 12,
            breakout_threshold: 0.01,
            volume_window: 12,
            volume_multiplier: 1.5,
            risk_free_rate: 0.02,
            slope_window: 10,
            min_stage_rows: 30,
            min_risk_rows: 20,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Benchmark index used when a request does not name one.
    pub benchmark_index: String,
    /// Years of NAV history fetched for funds.
    pub fund_years: u32,
    /// Years of price history fetched for equities.
    pub equity_years: u32,
    /// Years of benchmark history fetched.
    pub index_years: u32,
    /// HTTP request timeout for data sources (seconds).
    pub http_timeout_secs: u64,
    /// Attempts per data-source request before giving up.
    pub fetch_retries: u32,
    /// Whether Yahoo Finance backs up the primary source.
    pub yahoo_fallback: bool,
    /// Pipeline thresholds.
    pub analysis: AnalysisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            benchmark_index: DEFAULT_BENCHMARK.to_string(),
            fund_years: 3,
            equity_years: 5,
            index_years: 3,
            http_timeout_secs: 30,
            fetch_retries: 3,
            yahoo_fallback: true,
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let analysis = AnalysisConfig {
            risk_free_rate: env::var("RISK_FREE_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.analysis.risk_free_rate),
            rs_dead_zone: env::var("RS_DEAD_ZONE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.analysis.rs_dead_zone),
            breakout_threshold: env::var("BREAKOUT_THRESHOLD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.analysis.breakout_threshold),
            volume_multiplier: env::var("VOLUME_MULTIPLIER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.analysis.volume_multiplier),
            ..defaults.analysis.clone()
        };

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            benchmark_index: env::var("BENCHMARK_INDEX").unwrap_or(defaults.benchmark_index),
            fund_years: parse_years(env::var("FUND_YEARS").ok(), defaults.fund_years),
            equity_years: parse_years(env::var("EQUITY_YEARS").ok(), defaults.equity_years),
            index_years: parse_years(env::var("INDEX_YEARS").ok(), defaults.index_years),
            http_timeout_secs: env::var("HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.http_timeout_secs),
            fetch_retries: env::var("FETCH_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(defaults.fetch_retries),
            yahoo_fallback: env::var("ENABLE_YAHOO_FALLBACK")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.yahoo_fallback),
            analysis,
        }
    }
}

/// History length from an env value, falling back to `default` when unset or
/// malformed and capped at [`MAX_HISTORY_YEARS`].
fn parse_years(raw: Option<String>, default: u32) -> u32 {
    raw.and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
        .min(MAX_HISTORY_YEARS)
}
