use serde::{Deserialize, Serialize};

/// Trend stage of an instrument within its weekly cycle.
///
/// Serialized as its ordinal (0 to 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Stage {
    InsufficientData = 0,
    Basing = 1,
    Advancing = 2,
    Topping = 3,
    Declining = 4,
}

impl Stage {
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::InsufficientData => "insufficient data",
            Stage::Basing => "basing",
            Stage::Advancing => "advancing",
            Stage::Topping => "topping",
            Stage::Declining => "declining",
        }
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.ordinal()
    }
}

impl TryFrom<u8> for Stage {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Stage::InsufficientData),
            1 => Ok(Stage::Basing),
            2 => Ok(Stage::Advancing),
            3 => Ok(Stage::Topping),
            4 => Ok(Stage::Declining),
            other => Err(format!("invalid stage ordinal {}", other)),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Numbers the enhanced classifier based its decision on.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageMetrics {
    /// Close vs 20-week MA, percent.
    pub ma20_diff_pct: f64,
    /// Normalized 20-week MA slope, percent of level per week.
    pub ma20_slope: f64,
    /// Goodness-of-fit of the 20-week MA regression.
    pub ma20_r2: f64,
    /// Close vs 30-week MA, percent.
    pub ma30_diff_pct: f64,
    /// Normalized 30-week MA slope, percent of level per week.
    pub ma30_slope: f64,
    /// Goodness-of-fit of the 30-week MA regression.
    pub ma30_r2: f64,
    /// Latest volatility vs its trailing 20-week mean.
    pub vol_ratio: f64,
    /// +1 bullish stack, -1 bearish stack, 0 mixed.
    pub ma_arrangement: i8,
}

/// Output of the enhanced (fund) stage classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    /// In [0, 1].
    pub confidence: f64,
    pub reason: String,
    /// Absent when there was not enough history to compute them.
    pub key_metrics: Option<StageMetrics>,
}

impl StageResult {
    pub fn insufficient() -> Self {
        Self {
            stage: Stage::InsufficientData,
            confidence: 0.0,
            reason: "insufficient data".to_string(),
            key_metrics: None,
        }
    }
}

/// Output of the coarse (equity) stage classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityStage {
    pub stage: Stage,
    pub reason: String,
    /// Close vs 30-week MA, percent.
    pub ma30_diff_pct: f64,
    /// Raw 30-week MA slope, price units per week.
    pub ma30_slope: f64,
}

/// Excess return and win-rate over one lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookbackScore {
    /// Label such as `26w`.
    pub label: String,
    pub weeks: usize,
    /// Compounded instrument return minus compounded benchmark return.
    pub excess_return: f64,
    /// Share of weeks the instrument beat the benchmark; ties are not wins.
    pub win_rate: f64,
}

/// Output of the enhanced relative-strength evaluator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelativeStrengthResult {
    /// One entry per lookback, in the requested order.
    pub lookbacks: Vec<LookbackScore>,
    /// Mean excess log-return over its standard deviation.
    pub risk_adjusted_rs: f64,
    /// Excess return of the middle lookback.
    pub latest_rs: f64,
}

impl RelativeStrengthResult {
    pub fn score(&self, label: &str) -> Option<&LookbackScore> {
        self.lookbacks.iter().find(|l| l.label == label)
    }
}

/// Downside risk figures.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskResult {
    /// Most negative peak-to-close decline, percent (<= 0).
    pub max_drawdown: f64,
    /// Annualized std-dev of negative weekly returns, percent (>= 0).
    pub downside_vol: f64,
    /// Annualized excess return over annualized volatility.
    pub sharpe: f64,
}

/// Breakout, breakdown and volume confirmation for the latest week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BreakoutSignal {
    pub breakout: bool,
    pub breakdown: bool,
    pub volume_confirmed: bool,
}

/// Recommended action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    StrongBuy,
    Buy,
    LightBuy,
    LightAccumulate,
    PartialTakeProfit,
    Reduce,
    Sell,
    StopLoss,
    Liquidate,
    Hold,
    Wait,
}

impl Action {
    /// Suggested position size for this action.
    pub fn position_range(&self) -> PositionRange {
        match self {
            Action::StrongBuy => PositionRange::new(70, 90),
            Action::Buy => PositionRange::new(40, 60),
            Action::LightBuy => PositionRange::new(10, 30),
            Action::LightAccumulate => PositionRange::new(5, 15),
            Action::PartialTakeProfit => PositionRange::new(20, 40),
            Action::Reduce => PositionRange::new(0, 20),
            Action::Sell
            | Action::StopLoss
            | Action::Liquidate
            | Action::Hold
            | Action::Wait => PositionRange::flat(),
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(
            self,
            Action::StrongBuy | Action::Buy | Action::LightBuy | Action::LightAccumulate
        )
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Action::StrongBuy => "strong buy",
            Action::Buy => "buy",
            Action::LightBuy => "light buy",
            Action::LightAccumulate => "light accumulate",
            Action::PartialTakeProfit => "partial take-profit",
            Action::Reduce => "reduce",
            Action::Sell => "sell",
            Action::StopLoss => "stop-loss",
            Action::Liquidate => "liquidate",
            Action::Hold => "hold",
            Action::Wait => "wait",
        };
        f.write_str(label)
    }
}

/// Suggested position as a percentage range of the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRange {
    pub min: u8,
    pub max: u8,
}

impl PositionRange {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// Zero position.
    pub const fn flat() -> Self {
        Self { min: 0, max: 0 }
    }
}

/// Final recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceResult {
    pub action: Action,
    pub position: PositionRange,
    /// In [0, 100].
    pub score: f64,
    pub note: String,
    /// Stage confidence in percent; only the fund classifier scores it.
    pub confidence: Option<f64>,
}
