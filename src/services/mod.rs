pub mod advice;
pub mod analyzer;
pub mod breakout;
pub mod normalizer;
pub mod relative_strength;
pub mod risk;
pub mod rules;
pub mod stage;
pub mod stats;

#[cfg(test)]
pub(crate) mod testutil;

pub use advice::{equity_advice, fund_advice};
pub use analyzer::{build_equity_report, build_fund_report, Analyzer};
pub use normalizer::{normalize, normalize_benchmark, NormalizeOptions, SeriesProfile};
pub use stage::{classify_equity_stage, classify_fund_stage};
