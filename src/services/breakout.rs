//! Breakout, breakdown and volume confirmation on the latest week.

use crate::config::AnalysisConfig;
use crate::services::stats::{mean, round_to};
use crate::types::{BreakoutSignal, WeeklySeries};

/// Evaluate the latest week against the preceding `breakout_lookback` weeks.
///
/// Volume is only checked when a breakout fires; without a breakout, or
/// without volume data, it counts as confirmed.
pub fn detect(series: &WeeklySeries, config: &AnalysisConfig) -> BreakoutSignal {
    let lookback = config.breakout_lookback;
    let bars = series.bars();
    let quiet = BreakoutSignal {
        breakout: false,
        breakdown: false,
        volume_confirmed: true,
    };
    if lookback == 0 || bars.len() < lookback + 1 {
        return quiet;
    }

    let Some((latest, history)) = bars.split_last() else {
        return quiet;
    };
    let prior = &history[history.len() - lookback..];
    let upper = prior.iter().map(|b| b.close).fold(f64::MIN, f64::max);
    let lower = prior.iter().map(|b| b.close).fold(f64::MAX, f64::min);

    let breakout = latest.close > upper * (1.0 + config.breakout_threshold);
    let breakdown = latest.close < lower * (1.0 - config.breakout_threshold);

    let volume_confirmed = if breakout {
        volume_expanded(series, config).unwrap_or(true)
    } else {
        true
    };

    BreakoutSignal {
        breakout,
        breakdown,
        volume_confirmed,
    }
}

/// Latest volume vs `volume_multiplier` times the mean of the preceding
/// `volume_window` weeks; `None` when volume is missing anywhere.
fn volume_expanded(series: &WeeklySeries, config: &AnalysisConfig) -> Option<bool> {
    let (latest, history) = series.bars().split_last()?;
    let latest_volume = latest.volume?;
    let window = &history[history.len().saturating_sub(config.volume_window)..];
    let volumes = window
        .iter()
        .map(|b| b.volume)
        .collect::<Option<Vec<f64>>>()?;
    let avg = mean(&volumes)?;
    Some(latest_volume > avg * config.volume_multiplier)
}

/// Suggested stop just below the support level.
///
/// Uses the round number below a fractional support, else the support
/// itself, minus 0.05.
pub fn stop_loss(support: f64) -> f64 {
    let floor = support.floor();
    let base = if support > floor { floor } else { support };
    round_to(base - 0.05, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutil::equity_series;

    fn cfg() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    fn flat_then(last: f64) -> Vec<f64> {
        let mut closes = vec![10.0; 40];
        closes.push(last);
        closes
    }

    #[test]
    fn test_breakout_is_strict() {
        let signal = detect(&equity_series(&flat_then(10.1), None), &cfg());
        assert!(!signal.breakout);

        let signal = detect(&equity_series(&flat_then(10.101), None), &cfg());
        assert!(signal.breakout);
        assert!(!signal.breakdown);
    }

    #[test]
    fn test_breakdown() {
        let signal = detect(&equity_series(&flat_then(9.8), None), &cfg());
        assert!(signal.breakdown);
        assert!(!signal.breakout);
        assert!(signal.volume_confirmed);

        let signal = detect(&equity_series(&flat_then(9.9), None), &cfg());
        assert!(!signal.breakdown);
    }

    #[test]
    fn test_too_few_rows() {
        let mut config = cfg();
        config.breakout_lookback = 50;
        let signal = detect(&equity_series(&flat_then(12.0), None), &config);
        assert!(!signal.breakout);
        assert!(signal.volume_confirmed);
    }

    #[test]
    fn test_volume_confirmation() {
        let closes = flat_then(11.0);
        let mut volumes = vec![1000.0; 41];

        volumes[40] = 1600.0;
        let signal = detect(&equity_series(&closes, Some(&volumes)), &cfg());
        assert!(signal.breakout);
        assert!(signal.volume_confirmed);

        volumes[40] = 1500.0;
        let signal = detect(&equity_series(&closes, Some(&volumes)), &cfg());
        assert!(signal.breakout);
        assert!(!signal.volume_confirmed);
    }

    #[test]
    fn test_missing_volume_counts_as_confirmed() {
        let signal = detect(&equity_series(&flat_then(11.0), None), &cfg());
        assert!(signal.breakout);
        assert!(signal.volume_confirmed);
    }

    #[test]
    fn test_stop_loss() {
        assert_eq!(stop_loss(10.37), 9.95);
        assert_eq!(stop_loss(10.0), 9.95);
        assert_eq!(stop_loss(7.05), 6.95);
    }
}
