use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Instrument kinds understood by the data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Equity,
    Fund,
    Index,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Equity => "equity",
            InstrumentKind::Fund => "fund",
            InstrumentKind::Index => "index",
        }
    }
}

impl std::fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One raw daily record keyed by column name.
pub type RawRecord = Map<String, Value>;

/// Daily series exactly as a data source delivered it.
///
/// Column names depend on the vendor; the normalizer picks them apart with
/// schema adapters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSeries {
    pub records: Vec<RawRecord>,
}

impl RawSeries {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether any record carries the column.
    pub fn has_column(&self, column: &str) -> bool {
        self.records.iter().any(|r| r.contains_key(column))
    }
}

/// A resampled weekly observation before derived columns exist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeeklyPoint {
    /// Week-ending Friday.
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
}

/// One row of a normalized weekly series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBar {
    /// Week-ending Friday.
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
    pub ma10: f64,
    pub ma20: f64,
    pub ma30: f64,
    /// Simple return vs the prior week.
    pub ret: f64,
    /// Natural-log return vs the prior week.
    pub log_ret: f64,
    /// Rolling sample std-dev of `ret`.
    pub vol: f64,
    /// Rolling minimum close (equity profile only).
    pub support: Option<f64>,
    /// Rolling maximum close (equity profile only).
    pub resistance: Option<f64>,
}

/// Normalized weekly series of an instrument.
///
/// Dates are strictly increasing and every row has all declared columns.
/// Built once per request and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WeeklySeries {
    bars: Vec<WeeklyBar>,
}

impl WeeklySeries {
    pub(crate) fn from_bars(bars: Vec<WeeklyBar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        Self { bars }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[WeeklyBar] {
        &self.bars
    }

    pub fn latest(&self) -> Option<&WeeklyBar> {
        self.bars.last()
    }

    /// The row before the latest one.
    pub fn previous(&self) -> Option<&WeeklyBar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// The last `n` rows (fewer if the series is shorter).
    pub fn tail(&self, n: usize) -> &[WeeklyBar] {
        &self.bars[self.bars.len().saturating_sub(n)..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.ret).collect()
    }

    pub fn has_volume(&self) -> bool {
        self.bars.iter().any(|b| b.volume.is_some())
    }
}

/// One row of a normalized benchmark series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkBar {
    pub date: NaiveDate,
    pub close: f64,
    pub ret: f64,
    pub log_ret: f64,
}

/// Normalized weekly series of the benchmark index.
///
/// Only returns are declared, so the series keeps every week after the first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkSeries {
    bars: Vec<BenchmarkBar>,
}

impl BenchmarkSeries {
    pub(crate) fn from_bars(bars: Vec<BenchmarkBar>) -> Self {
        debug_assert!(bars.windows(2).all(|w| w[0].date < w[1].date));
        Self { bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[BenchmarkBar] {
        &self.bars
    }
}

impl From<&WeeklySeries> for BenchmarkSeries {
    fn from(series: &WeeklySeries) -> Self {
        Self {
            bars: series
                .bars()
                .iter()
                .map(|b| BenchmarkBar {
                    date: b.date,
                    close: b.close,
                    ret: b.ret,
                    log_ret: b.log_ret,
                })
                .collect(),
        }
    }
}
