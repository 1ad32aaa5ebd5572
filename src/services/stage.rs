//! Trend stage classification.
//!
//! Two classifiers live here. The enhanced one (funds) fits a line through
//! the recent 30-week average and scores its confidence; the coarse one
//! (equities) only looks at price vs the average and the average's slope.

use crate::config::AnalysisConfig;
use crate::services::rules::{first_match, Rule};
use crate::services::stats::{linear_fit, mean, round_to};
use crate::types::{EquityStage, Stage, StageMetrics, StageResult, WeeklySeries};

/// Indicators the enhanced rule chain decides on.
#[derive(Debug, Clone, Copy)]
struct StageInputs {
    close: f64,
    prev_close: f64,
    ma10: f64,
    diff10: f64,
    diff30: f64,
    slope30: f64,
    r2_30: f64,
    vol_ratio: f64,
    arrangement: i8,
}

type Verdict = (Stage, f64, String);

const FUND_STAGE_RULES: &[Rule<StageInputs, Verdict>] = &[
    Rule {
        name: "declining",
        when: |m| {
            m.diff30 < -3.0
                && m.slope30 < -0.1
                && m.r2_30 > 0.7
                && m.arrangement == -1
                && m.close < m.prev_close
        },
        then: |m| {
            (
                Stage::Declining,
                (m.slope30.abs() + m.diff30.abs() / 5.0 + (1.0 - m.vol_ratio / 2.0)).min(0.9),
                format!(
                    "close {:.1}% vs the 30-week MA, MA slope {:.2} (R²={:.2}), bearish MA stack: confirmed downtrend",
                    m.diff30, m.slope30, m.r2_30
                ),
            )
        },
    },
    Rule {
        name: "advancing",
        when: |m| {
            m.diff30 > 1.0
                && m.slope30 > 0.1
                && m.r2_30 > 0.7
                && m.arrangement == 1
                && m.close > m.prev_close
                && m.vol_ratio > 0.8
        },
        then: |m| {
            (
                Stage::Advancing,
                (m.slope30 + m.diff30 / 10.0 + m.r2_30).min(0.9),
                format!(
                    "close {:.1}% above the 30-week MA, MA slope {:.2} (R²={:.2}), bullish MA stack with healthy volatility: confirmed uptrend",
                    m.diff30, m.slope30, m.r2_30
                ),
            )
        },
    },
    Rule {
        name: "topping",
        when: |m| {
            m.diff30 > 0.0
                && m.slope30 < 0.1
                && m.r2_30 < 0.5
                && m.diff10.abs() < 2.0
                && m.vol_ratio > 1.2
        },
        then: |m| {
            (
                Stage::Topping,
                (m.diff10.abs() / 2.0 + m.vol_ratio / 2.0 + (1.0 - m.r2_30)).min(0.8),
                format!(
                    "price above a flattening MA while volatility expands ({:.1}x): topping pattern",
                    m.vol_ratio
                ),
            )
        },
    },
    Rule {
        name: "basing",
        when: |m| {
            m.diff30 < 0.0
                && m.slope30 > -0.1
                && m.r2_30 < 0.5
                && m.vol_ratio < 0.8
                && m.close > m.ma10
        },
        then: |m| {
            (
                Stage::Basing,
                ((1.0 - m.diff30.abs() / 5.0) + (1.0 - m.vol_ratio) + m.r2_30).min(0.8),
                format!(
                    "price near the MA ({:.1}%) with contracting volatility ({:.1}x): basing pattern",
                    m.diff30, m.vol_ratio
                ),
            )
        },
    },
];

fn unclassified(m: &StageInputs) -> Verdict {
    (
        Stage::Basing,
        0.3,
        format!(
            "no clear trend (MA deviation {:.1}%, slope {:.2}); treated as basing",
            m.diff30, m.slope30
        ),
    )
}

/// Normalized slope (percent of level per week) and R² of the last `window`
/// values of a moving-average column.
fn normalized_slope(values: &[f64], window: usize) -> (f64, f64) {
    if values.len() < window {
        return (0.0, 0.0);
    }
    let recent = &values[values.len() - window..];
    match (linear_fit(recent), mean(recent)) {
        (Some(fit), Some(level)) if level != 0.0 => (fit.slope / level * 100.0, fit.r_squared),
        (Some(fit), _) => (0.0, fit.r_squared),
        _ => (0.0, 0.0),
    }
}

fn pct_diff(close: f64, ma: f64) -> f64 {
    (close / ma - 1.0) * 100.0
}

/// Enhanced stage classifier used for funds.
pub fn classify_fund_stage(series: &WeeklySeries, config: &AnalysisConfig) -> StageResult {
    if series.len() < config.min_stage_rows.max(2) {
        return StageResult::insufficient();
    }
    let (Some(latest), Some(previous)) = (series.latest(), series.previous()) else {
        return StageResult::insufficient();
    };

    let ma30: Vec<f64> = series.bars().iter().map(|b| b.ma30).collect();
    let (slope30, r2_30) = normalized_slope(&ma30, config.slope_window);
    // Reported only; the rules decide on the 30-week average.
    let ma20: Vec<f64> = series.bars().iter().map(|b| b.ma20).collect();
    let (slope20, r2_20) = normalized_slope(&ma20, config.slope_window);

    let recent_vol: Vec<f64> = series.tail(20).iter().map(|b| b.vol).collect();
    let vol_ratio = match mean(&recent_vol) {
        Some(avg) if avg > 0.0 => latest.vol / avg,
        _ => 1.0,
    };

    let arrangement = if latest.ma10 > latest.ma20 && latest.ma20 > latest.ma30 {
        1
    } else if latest.ma10 < latest.ma20 && latest.ma20 < latest.ma30 {
        -1
    } else {
        0
    };

    let inputs = StageInputs {
        close: latest.close,
        prev_close: previous.close,
        ma10: latest.ma10,
        diff10: pct_diff(latest.close, latest.ma10),
        diff30: pct_diff(latest.close, latest.ma30),
        slope30,
        r2_30,
        vol_ratio,
        arrangement,
    };

    let matched = first_match(FUND_STAGE_RULES, &inputs, unclassified);
    let (stage, confidence, reason) = matched.output;

    StageResult {
        stage,
        confidence: round_to(confidence.clamp(0.0, 1.0), 2),
        reason,
        key_metrics: Some(StageMetrics {
            ma20_diff_pct: round_to(pct_diff(latest.close, latest.ma20), 2),
            ma20_slope: round_to(slope20, 2),
            ma20_r2: round_to(r2_20, 2),
            ma30_diff_pct: round_to(inputs.diff30, 2),
            ma30_slope: round_to(inputs.slope30, 2),
            ma30_r2: round_to(inputs.r2_30, 2),
            vol_ratio: round_to(inputs.vol_ratio, 2),
            ma_arrangement: inputs.arrangement,
        }),
    }
}

#[derive(Debug, Clone, Copy)]
struct EquityInputs {
    close: f64,
    ma30: f64,
    slope: f64,
    diff: f64,
}

const EQUITY_STAGE_RULES: &[Rule<EquityInputs, (Stage, &'static str)>] = &[
    Rule {
        name: "declining",
        when: |m| m.close < m.ma30 && m.slope < 0.0 && m.diff < -0.03,
        then: |_| (Stage::Declining, "below a falling 30-week MA by more than 3%"),
    },
    Rule {
        name: "advancing",
        when: |m| m.close > m.ma30 && m.slope > 0.0,
        then: |_| (Stage::Advancing, "above a rising 30-week MA"),
    },
    Rule {
        name: "topping",
        when: |m| m.close > m.ma30 && m.slope <= 0.0,
        then: |_| (Stage::Topping, "above a flat or falling 30-week MA"),
    },
];

/// Coarse stage classifier used for equities.
pub fn classify_equity_stage(series: &WeeklySeries, config: &AnalysisConfig) -> EquityStage {
    let Some(latest) = series.latest() else {
        return EquityStage {
            stage: Stage::InsufficientData,
            reason: Stage::InsufficientData.name().to_string(),
            ma30_diff_pct: 0.0,
            ma30_slope: 0.0,
        };
    };

    let window = series.tail(config.slope_window);
    let slope = if window.len() < config.slope_window {
        0.0
    } else {
        let ma30: Vec<f64> = window.iter().map(|b| b.ma30).collect();
        linear_fit(&ma30).map(|fit| fit.slope).unwrap_or(0.0)
    };

    let inputs = EquityInputs {
        close: latest.close,
        ma30: latest.ma30,
        slope,
        diff: latest.close / latest.ma30 - 1.0,
    };

    let matched = first_match(EQUITY_STAGE_RULES, &inputs, |_| {
        (Stage::Basing, "price hugging the 30-week MA")
    });
    let (stage, reason) = matched.output;

    EquityStage {
        stage,
        reason: reason.to_string(),
        ma30_diff_pct: round_to(inputs.diff * 100.0, 2),
        ma30_slope: round_to(inputs.slope, 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::{equity_series, fund_series, linear};

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    // ========================================================================
    // Fund classifier
    // ========================================================================

    #[test]
    fn test_short_series_is_insufficient() {
        // 58 weekly points leave 29 complete rows.
        let series = fund_series(&linear(1.0, 0.01, 58));
        assert_eq!(series.len(), 29);
        let result = classify_fund_stage(&series, &cfg());
        assert_eq!(result.stage, Stage::InsufficientData);
        assert_eq!(result.confidence, 0.0);
        assert!(result.key_metrics.is_none());
    }

    #[test]
    fn test_steady_rise_is_advancing() {
        let series = fund_series(&linear(0.71, 0.01, 69));
        assert_eq!(series.len(), 40);

        let result = classify_fund_stage(&series, &cfg());
        assert_eq!(result.stage, Stage::Advancing);
        assert_eq!(result.confidence, 0.9);

        let metrics = result.key_metrics.unwrap();
        assert_eq!(metrics.ma_arrangement, 1);
        assert_eq!(metrics.ma30_r2, 1.0);
        assert_eq!(metrics.ma20_r2, 1.0);
        assert!(metrics.ma20_slope > 0.1);
        assert!(metrics.ma20_diff_pct > 0.0);
        assert!(metrics.ma20_diff_pct < metrics.ma30_diff_pct);
        assert!(metrics.ma30_diff_pct > 1.0);
        assert!(metrics.ma30_slope > 0.1);
    }

    #[test]
    fn test_steady_decline_is_declining() {
        let series = fund_series(&linear(2.0, -0.01, 70));
        let result = classify_fund_stage(&series, &cfg());
        assert_eq!(result.stage, Stage::Declining);
        assert_eq!(result.key_metrics.unwrap().ma_arrangement, -1);
    }

    #[test]
    fn test_declining_takes_precedence() {
        // A crash at the end of a long decline spikes volatility; declining is
        // checked first so the spike cannot push it into another stage.
        let mut closes = linear(3.0, -0.02, 60);
        closes.push(1.5);
        let result = classify_fund_stage(&fund_series(&closes), &cfg());
        assert_eq!(result.stage, Stage::Declining);
        assert!(result.confidence <= 0.9);
    }

    #[test]
    fn test_flat_series_falls_back_to_basing() {
        let result = classify_fund_stage(&fund_series(&[10.0; 60]), &cfg());
        assert_eq!(result.stage, Stage::Basing);
        assert_eq!(result.confidence, 0.3);
        let metrics = result.key_metrics.unwrap();
        assert_eq!(metrics.vol_ratio, 1.0);
        assert_eq!(metrics.ma_arrangement, 0);
    }

    #[test]
    fn test_stage_and_confidence_bounds() {
        let shapes: Vec<Vec<f64>> = vec![
            linear(1.0, 0.01, 80),
            linear(5.0, -0.03, 80),
            (0..80).map(|i| 10.0 + (i as f64 / 3.0).sin()).collect(),
            (0..80).map(|i| 10.0 + if i % 2 == 0 { 0.5 } else { -0.5 }).collect(),
            (0..80).map(|i| 8.0 + (i as f64 / 10.0).powi(2) / 10.0).collect(),
        ];
        for closes in shapes {
            let result = classify_fund_stage(&fund_series(&closes), &cfg());
            assert!(result.stage.ordinal() <= 4);
            assert!((0.0..=1.0).contains(&result.confidence));
            assert!(!result.reason.is_empty());
        }
    }

    // ========================================================================
    // Equity classifier
    // ========================================================================

    #[test]
    fn test_equity_empty_series() {
        let stage = classify_equity_stage(&WeeklySeries::empty(), &cfg());
        assert_eq!(stage.stage, Stage::InsufficientData);
    }

    #[test]
    fn test_equity_advancing() {
        let stage = classify_equity_stage(&equity_series(&linear(10.0, 0.1, 60), None), &cfg());
        assert_eq!(stage.stage, Stage::Advancing);
        assert!(stage.ma30_slope > 0.0);
        assert!(stage.ma30_diff_pct > 0.0);
    }

    #[test]
    fn test_equity_declining() {
        let stage = classify_equity_stage(&equity_series(&linear(20.0, -0.1, 60), None), &cfg());
        assert_eq!(stage.stage, Stage::Declining);
        assert!(stage.ma30_diff_pct < -3.0);
    }

    #[test]
    fn test_equity_topping() {
        // Long decline then a pop above the still-falling average.
        let mut closes = linear(20.0, -0.1, 59);
        closes.push(20.0);
        let stage = classify_equity_stage(&equity_series(&closes, None), &cfg());
        assert_eq!(stage.stage, Stage::Topping);
    }

    #[test]
    fn test_equity_flat_is_basing() {
        let stage = classify_equity_stage(&equity_series(&[10.0; 59], None), &cfg());
        assert_eq!(stage.stage, Stage::Basing);
        assert_eq!(stage.ma30_diff_pct, 0.0);
    }
}
