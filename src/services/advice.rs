//! Turns stage, relative strength, risk and breakout signals into advice.

use crate::services::rules::{first_match, Rule};
use crate::services::stats::round_to;
use crate::types::{
    Action, AdviceResult, BreakoutSignal, EquityStage, RelativeStrengthResult, RiskResult, Stage,
    StageResult,
};

// ============================================================================
// Fund advice
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct FundInputs {
    stage: Stage,
    confidence: f64,
    latest_rs: f64,
    sharpe: f64,
    max_drawdown: f64,
}

/// Action, note and score before refinement.
fn fund_baseline(stage: Stage) -> (Action, &'static str, f64) {
    match stage {
        Stage::InsufficientData => (Action::Wait, "not enough data to judge the trend", 0.0),
        Stage::Basing => (Action::Hold, "basing; wait for a confirmed breakout", 50.0),
        Stage::Advancing => (Action::Buy, "advancing; the trend is clear", 80.0),
        Stage::Topping => (Action::Reduce, "topping; the trend is weakening", 40.0),
        Stage::Declining => (Action::Sell, "declining; risk is elevated", 20.0),
    }
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

const FUND_REFINEMENTS: &[Rule<FundInputs, Option<(Action, String)>>] = &[
    Rule {
        name: "advancing-strong",
        when: |m| m.stage == Stage::Advancing && m.latest_rs > 0.05 && m.sharpe > 1.0,
        then: |m| {
            Some((
                Action::StrongBuy,
                format!(
                    "excellent relative strength ({}) and risk-adjusted return (Sharpe {}); build a core position",
                    pct(m.latest_rs),
                    m.sharpe
                ),
            ))
        },
    },
    Rule {
        name: "advancing-steady",
        when: |m| m.stage == Stage::Advancing && m.latest_rs > 0.0 && m.sharpe > 0.0,
        then: |m| {
            Some((
                Action::Buy,
                format!(
                    "good relative strength ({}); accumulate in batches",
                    pct(m.latest_rs)
                ),
            ))
        },
    },
    Rule {
        name: "advancing-weak",
        when: |m| m.stage == Stage::Advancing,
        then: |m| {
            Some((
                Action::LightBuy,
                format!(
                    "but relative strength is weak ({}) or risk is high (max drawdown {}%); keep the position light",
                    pct(m.latest_rs),
                    m.max_drawdown
                ),
            ))
        },
    },
    Rule {
        name: "basing-positive",
        when: |m| m.stage == Stage::Basing && m.latest_rs > 0.0 && m.max_drawdown > -10.0,
        then: |m| {
            Some((
                Action::LightAccumulate,
                format!(
                    "but relative strength is positive ({}) with contained drawdown; a small early position is reasonable",
                    pct(m.latest_rs)
                ),
            ))
        },
    },
    Rule {
        name: "topping-positive",
        when: |m| m.stage == Stage::Topping && m.latest_rs > 0.0 && m.confidence < 0.5,
        then: |m| {
            Some((
                Action::PartialTakeProfit,
                format!(
                    "but relative strength is still positive ({}); take partial profits rather than exit",
                    pct(m.latest_rs)
                ),
            ))
        },
    },
    Rule {
        name: "declining-stop",
        when: |m| m.stage == Stage::Declining && m.max_drawdown < -20.0 && m.sharpe < 0.0,
        then: |m| {
            Some((
                Action::StopLoss,
                format!(
                    "max drawdown {}% and Sharpe {}; cut losses now",
                    m.max_drawdown, m.sharpe
                ),
            ))
        },
    },
];

/// Graded advice for a fund.
pub fn fund_advice(
    stage: &StageResult,
    relative_strength: &RelativeStrengthResult,
    risk: &RiskResult,
) -> AdviceResult {
    let inputs = FundInputs {
        stage: stage.stage,
        confidence: stage.confidence,
        latest_rs: relative_strength.latest_rs,
        sharpe: risk.sharpe,
        max_drawdown: risk.max_drawdown,
    };

    let (base_action, base_note, base_score) = fund_baseline(inputs.stage);
    let rs_factor = (inputs.latest_rs + 0.1).clamp(0.0, 1.0);
    let risk_factor = (1.0 + inputs.sharpe / 2.0).clamp(0.5, 1.0);
    let score = (base_score * inputs.confidence * rs_factor * risk_factor).clamp(0.0, 100.0);

    let (action, note) = match first_match(FUND_REFINEMENTS, &inputs, |_| None).output {
        Some((action, detail)) => (action, format!("{}, {}", base_note, detail)),
        None => (base_action, base_note.to_string()),
    };

    AdviceResult {
        action,
        position: action.position_range(),
        score: round_to(score, 1),
        note,
        confidence: Some(round_to(inputs.confidence * 100.0, 1)),
    }
}

// ============================================================================
// Equity advice
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct EquityInputs {
    stage: Stage,
    rs: f64,
    dead_zone: f64,
    breakout: bool,
    breakdown: bool,
    volume_confirmed: bool,
}

impl EquityInputs {
    fn leading(&self) -> bool {
        self.rs > self.dead_zone
    }

    fn neutral(&self) -> bool {
        self.rs.abs() <= self.dead_zone
    }
}

type EquityVerdict = (Action, String, f64);

const EQUITY_RULES: &[Rule<EquityInputs, EquityVerdict>] = &[
    Rule {
        name: "advancing-confirmed-breakout",
        when: |m| m.stage == Stage::Advancing && m.leading() && m.breakout && m.volume_confirmed,
        then: |_| {
            (
                Action::Buy,
                "advancing, outperforming the index with a volume-backed breakout; build in batches and add on pullbacks to the MA".to_string(),
                85.0,
            )
        },
    },
    Rule {
        name: "advancing-thin-breakout",
        when: |m| m.stage == Stage::Advancing && m.leading() && m.breakout,
        then: |_| {
            (
                Action::Hold,
                "advancing and outperforming with a breakout, but volume has not expanded; wait for a pullback to the 30-week MA".to_string(),
                70.0,
            )
        },
    },
    Rule {
        name: "advancing-no-breakout",
        when: |m| m.stage == Stage::Advancing && m.leading(),
        then: |_| {
            (
                Action::Hold,
                "advancing and outperforming, but no breakout yet; wait for a breakout or a pullback to the 30-week MA".to_string(),
                65.0,
            )
        },
    },
    Rule {
        name: "advancing-neutral-breakout",
        when: |m| m.stage == Stage::Advancing && m.neutral() && m.breakout,
        then: |_| {
            (
                Action::Hold,
                "advancing with a breakout, but relative strength is near zero; wait for it to turn positive on rising volume".to_string(),
                60.0,
            )
        },
    },
    Rule {
        name: "advancing-lagging",
        when: |m| m.stage == Stage::Advancing,
        then: |m| {
            (
                Action::Hold,
                format!(
                    "advancing, but relative strength is {:.4} vs the index; prefer stronger names",
                    m.rs
                ),
                55.0,
            )
        },
    },
    Rule {
        name: "basing",
        when: |m| m.stage == Stage::Basing,
        then: |_| {
            (
                Action::Hold,
                "basing; wait for a weekly close above a rising 30-week MA".to_string(),
                60.0,
            )
        },
    },
    Rule {
        name: "topping-leading",
        when: |m| m.stage == Stage::Topping && m.leading(),
        then: |_| {
            (
                Action::Reduce,
                "topping while still outperforming; scale out, starting with half the position".to_string(),
                45.0,
            )
        },
    },
    Rule {
        name: "topping-lagging",
        when: |m| m.stage == Stage::Topping,
        then: |m| {
            (
                Action::Reduce,
                format!(
                    "topping and lagging the index (rs={:.4}); cut to a third of the position or less",
                    m.rs
                ),
                40.0,
            )
        },
    },
    Rule {
        name: "declining-above-support",
        when: |m| m.stage == Stage::Declining && !m.breakdown,
        then: |_| {
            (
                Action::StopLoss,
                "declining below a falling MA; keep a strict stop just under support".to_string(),
                25.0,
            )
        },
    },
    Rule {
        name: "declining-breakdown",
        when: |m| m.stage == Stage::Declining,
        then: |_| {
            (
                Action::Liquidate,
                "declining and broke below support; exit the position".to_string(),
                15.0,
            )
        },
    },
];

fn equity_fallback(m: &EquityInputs) -> EquityVerdict {
    (
        Action::Hold,
        format!("cannot judge the trend (stage {}); stay on the sidelines", m.stage.ordinal()),
        50.0,
    )
}

/// Stage-first advice for an equity.
pub fn equity_advice(
    stage: &EquityStage,
    relative_strength: f64,
    signal: &BreakoutSignal,
    dead_zone: f64,
) -> AdviceResult {
    let inputs = EquityInputs {
        stage: stage.stage,
        rs: relative_strength,
        dead_zone,
        breakout: signal.breakout,
        breakdown: signal.breakdown,
        volume_confirmed: signal.volume_confirmed,
    };

    let (action, note, score) = first_match(EQUITY_RULES, &inputs, equity_fallback).output;

    AdviceResult {
        action,
        position: action.position_range(),
        score,
        note,
        confidence: None,
    }
}
