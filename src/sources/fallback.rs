//! Primary/secondary source chaining.

use async_trait::async_trait;
use tracing::warn;

use super::{MarketDataSource, SeriesRequest};
use crate::error::SourceError;
use crate::types::{InstrumentInfo, InstrumentKind, RawSeries};

/// Tries the primary source first and the secondary when the primary fails
/// or comes back empty.
///
/// When both fail the primary's error is reported.
pub struct FallbackSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P: MarketDataSource, S: MarketDataSource> FallbackSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P: MarketDataSource, S: MarketDataSource> MarketDataSource for FallbackSource<P, S> {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        let primary = match self.primary.fetch_daily(request).await {
            Ok(raw) if !raw.is_empty() => return Ok(raw),
            Ok(raw) => {
                warn!("{} returned no rows for {} {}", self.primary.name(), request.kind, request.code);
                Ok(raw)
            }
            Err(e) => {
                warn!("{} failed for {} {}: {}", self.primary.name(), request.kind, request.code, e);
                Err(e)
            }
        };

        match self.secondary.fetch_daily(request).await {
            Ok(raw) => Ok(raw),
            Err(e) => {
                warn!("{} failed for {} {}: {}", self.secondary.name(), request.kind, request.code, e);
                primary
            }
        }
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        match self.primary.fetch_info(kind, code).await {
            Ok(info) => Ok(info),
            Err(primary) => {
                warn!("{} info lookup failed for {}: {}", self.primary.name(), code, primary);
                self.secondary.fetch_info(kind, code).await.or(Err(primary))
            }
        }
    }
}
