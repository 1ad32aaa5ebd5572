//! Relative strength of an instrument against its benchmark.

use crate::services::stats::{mean, round_to, sample_std};
use crate::types::{BenchmarkSeries, LookbackScore, RelativeStrengthResult, WeeklySeries};

/// Returns of both series on one shared week.
#[derive(Debug, Clone, Copy, PartialEq)]
struct JoinedWeek {
    ret: f64,
    log_ret: f64,
    bench_ret: f64,
    bench_log_ret: f64,
}

/// Inner join on date; both inputs are sorted ascending.
fn join(instrument: &WeeklySeries, benchmark: &BenchmarkSeries) -> Vec<JoinedWeek> {
    let (left, right) = (instrument.bars(), benchmark.bars());
    let mut joined = Vec::with_capacity(left.len().min(right.len()));
    let (mut i, mut j) = (0, 0);

    while i < left.len() && j < right.len() {
        match left[i].date.cmp(&right[j].date) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                joined.push(JoinedWeek {
                    ret: left[i].ret,
                    log_ret: left[i].log_ret,
                    bench_ret: right[j].ret,
                    bench_log_ret: right[j].log_ret,
                });
                i += 1;
                j += 1;
            }
        }
    }
    joined
}

fn lookback_label(weeks: usize) -> String {
    format!("{}w", weeks)
}

fn score_window(weeks: usize, window: &[JoinedWeek]) -> LookbackScore {
    let compounded = |f: fn(&JoinedWeek) -> f64| window.iter().map(|w| 1.0 + f(w)).product::<f64>();
    let excess = compounded(|w| w.ret) - compounded(|w| w.bench_ret);

    let wins = window.iter().filter(|w| w.ret > w.bench_ret).count();
    let win_rate = if window.is_empty() { 0.0 } else { wins as f64 / window.len() as f64 };

    LookbackScore {
        label: lookback_label(weeks),
        weeks,
        excess_return: round_to(excess, 4),
        win_rate: round_to(win_rate, 2),
    }
}

fn zero_scores(lookbacks: &[usize]) -> RelativeStrengthResult {
    RelativeStrengthResult {
        lookbacks: lookbacks
            .iter()
            .map(|&weeks| LookbackScore {
                label: lookback_label(weeks),
                weeks,
                excess_return: 0.0,
                win_rate: 0.0,
            })
            .collect(),
        risk_adjusted_rs: 0.0,
        latest_rs: 0.0,
    }
}

/// Multi-lookback relative strength used for funds.
///
/// `risk_window` caps how many recent joined weeks feed the risk-adjusted
/// score. `latest_rs` is the excess return of the middle lookback.
pub fn evaluate(
    instrument: &WeeklySeries,
    benchmark: &BenchmarkSeries,
    lookbacks: &[usize],
    risk_window: usize,
) -> RelativeStrengthResult {
    let joined = join(instrument, benchmark);
    let longest = lookbacks.iter().copied().max().unwrap_or(0);
    if joined.len() < longest {
        return zero_scores(lookbacks);
    }

    let scores: Vec<LookbackScore> = lookbacks
        .iter()
        .map(|&weeks| score_window(weeks, &joined[joined.len() - weeks..]))
        .collect();

    let recent = &joined[joined.len().saturating_sub(risk_window)..];
    let excess_log: Vec<f64> = recent.iter().map(|w| w.log_ret - w.bench_log_ret).collect();
    let risk_adjusted = match (mean(&excess_log), sample_std(&excess_log)) {
        (Some(m), Some(sd)) if sd > 0.0 => m / sd,
        _ => 0.0,
    };

    let latest_rs = scores
        .get(scores.len() / 2)
        .map(|s| s.excess_return)
        .unwrap_or(0.0);

    RelativeStrengthResult {
        lookbacks: scores,
        risk_adjusted_rs: round_to(risk_adjusted, 3),
        latest_rs,
    }
}

/// Mean weekly return minus the benchmark's over the last `lookback` joined
/// weeks; 0 when fewer are available.
pub fn simple_relative_strength(
    instrument: &WeeklySeries,
    benchmark: &BenchmarkSeries,
    lookback: usize,
) -> f64 {
    let joined = join(instrument, benchmark);
    if lookback == 0 || joined.len() < lookback {
        return 0.0;
    }
    let window = &joined[joined.len() - lookback..];
    let ours: Vec<f64> = window.iter().map(|w| w.ret).collect();
    let theirs: Vec<f64> = window.iter().map(|w| w.bench_ret).collect();
    match (mean(&ours), mean(&theirs)) {
        (Some(a), Some(b)) => a - b,
        _ => 0.0,
    }
}
