use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    AdviceResult, BreakoutSignal, EquityStage, RelativeStrengthResult, RiskResult, StageResult,
};
use crate::error::AnalysisError;

/// Identity details reported by the data source (name, type, manager...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub code: String,
    pub name: Option<String>,
    /// Free-form vendor fields.
    pub details: BTreeMap<String, String>,
}

impl InstrumentInfo {
    pub fn bare(code: &str) -> Self {
        Self {
            code: code.to_string(),
            ..Self::default()
        }
    }
}

/// Latest weekly observation of an equity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquitySnapshot {
    pub date: NaiveDate,
    pub close: f64,
    pub ma30: f64,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
    /// Suggested stop just below the support level.
    pub stop_loss: Option<f64>,
}

/// Latest weekly observation of a fund.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundSnapshot {
    pub nav_date: NaiveDate,
    pub nav: f64,
    pub ma30: f64,
    pub max_drawdown: f64,
    pub downside_vol: f64,
    pub sharpe: f64,
}

/// Full analysis of an equity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityReport {
    pub code: String,
    pub info: InstrumentInfo,
    pub analyzed_at: DateTime<Utc>,
    pub latest: EquitySnapshot,
    pub stage: EquityStage,
    /// Mean weekly excess return over the benchmark.
    pub relative_strength: f64,
    pub risk: RiskResult,
    pub breakout: BreakoutSignal,
    pub advice: AdviceResult,
}

/// Full analysis of a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundReport {
    pub code: String,
    pub benchmark: String,
    pub info: InstrumentInfo,
    pub analyzed_at: DateTime<Utc>,
    pub latest: FundSnapshot,
    pub stage: StageResult,
    pub relative_strength: RelativeStrengthResult,
    pub risk: RiskResult,
    pub advice: AdviceResult,
}

/// Error payload returned in place of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: String,
    pub code: String,
}

impl ErrorPayload {
    pub fn new(code: &str, error: &AnalysisError) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

/// Either a report or a well-formed error; never a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisOutcome<T> {
    Report(T),
    Failed(ErrorPayload),
}

impl<T> AnalysisOutcome<T> {
    pub fn is_report(&self) -> bool {
        matches!(self, AnalysisOutcome::Report(_))
    }

    pub fn report(&self) -> Option<&T> {
        match self {
            AnalysisOutcome::Report(report) => Some(report),
            AnalysisOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorPayload> {
        match self {
            AnalysisOutcome::Report(_) => None,
            AnalysisOutcome::Failed(payload) => Some(payload),
        }
    }
}
