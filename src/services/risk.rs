//! Drawdown, downside volatility and Sharpe ratio over the weekly series.

use crate::services::stats::{mean, round_to, sample_std};
use crate::types::{RiskResult, WeeklySeries};

const WEEKS_PER_YEAR: f64 = 52.0;

/// Risk figures for the whole series; zeros below `min_rows` rows.
pub fn assess(series: &WeeklySeries, risk_free_rate: f64, min_rows: usize) -> RiskResult {
    if series.len() < min_rows.max(1) {
        return RiskResult::default();
    }

    let mut peak = f64::MIN;
    let mut max_drawdown = 0.0_f64;
    for close in series.closes() {
        peak = peak.max(close);
        max_drawdown = max_drawdown.min((close / peak - 1.0) * 100.0);
    }

    let returns = series.returns();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_vol = sample_std(&losses)
        .map(|sd| sd * WEEKS_PER_YEAR.sqrt() * 100.0)
        .unwrap_or(0.0);

    let sharpe = match (mean(&returns), sample_std(&returns)) {
        (Some(m), Some(sd)) if sd > 0.0 => {
            (m * WEEKS_PER_YEAR - risk_free_rate) / (sd * WEEKS_PER_YEAR.sqrt())
        }
        _ => 0.0,
    };

    RiskResult {
        max_drawdown: round_to(max_drawdown, 2),
        downside_vol: round_to(downside_vol, 2),
        sharpe: round_to(sharpe, 3),
    }
}
