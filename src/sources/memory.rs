//! In-memory source for tests and offline demos.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{MarketDataSource, SeriesRequest};
use crate::error::SourceError;
use crate::types::{InstrumentInfo, InstrumentKind, RawSeries};

/// Serves preloaded raw series and identity records keyed by (kind, code).
///
/// Unknown keys fail with [`SourceError::Empty`], the same way a live source
/// reports an instrument it has no data for.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    series: HashMap<(InstrumentKind, String), RawSeries>,
    info: HashMap<(InstrumentKind, String), InstrumentInfo>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, kind: InstrumentKind, code: &str, raw: RawSeries) -> Self {
        self.series.insert((kind, code.to_string()), raw);
        self
    }

    pub fn with_info(mut self, kind: InstrumentKind, info: InstrumentInfo) -> Self {
        self.info.insert((kind, info.code.clone()), info);
        self
    }
}

#[async_trait]
impl MarketDataSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        self.series
            .get(&(request.kind, request.code.clone()))
            .cloned()
            .ok_or_else(|| SourceError::Empty(request.code.clone()))
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        self.info
            .get(&(kind, code.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::Empty(code.to_string()))
    }
}
