//! Yahoo Finance client, used as the backup for A-share equities and indices.
//!
//! Daily chart history is emitted with English column names (`date`,
//! `close`, `volume`). Funds are not listed on Yahoo.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{exchange_of, with_retries, MarketDataSource, SeriesRequest};
use crate::config::Config;
use crate::error::SourceError;
use crate::types::{InstrumentInfo, InstrumentKind, RawRecord, RawSeries};

/// Yahoo Finance chart response.
#[derive(Debug, Deserialize)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Debug, Deserialize)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct YahooResult {
    meta: YahooMeta,
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooMeta {
    symbol: String,
    currency: Option<String>,
    exchange_name: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
}

#[derive(Debug, Deserialize)]
struct YahooQuote {
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Yahoo ticker for an A-share code: `600519.SS`, `000001.SZ`.
///
/// Exchange resolution follows [`exchange_of`], so `sh000300` and a bare
/// index `000300` both become `000300.SS`.
pub fn yahoo_ticker(kind: InstrumentKind, code: &str) -> Result<String, SourceError> {
    if kind == InstrumentKind::Fund {
        return Err(SourceError::Unsupported(format!("fund {} on Yahoo Finance", code)));
    }
    let (bare, shanghai) = exchange_of(kind, code);
    Ok(format!("{}.{}", bare, if shanghai { "SS" } else { "SZ" }))
}

fn chart_result(response: YahooChartResponse) -> Result<YahooResult, SourceError> {
    if let Some(error) = response.chart.error {
        return Err(SourceError::Api(format!(
            "Yahoo API error: {} - {}",
            error.code, error.description
        )));
    }
    response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| SourceError::Parse("no results in chart response".to_string()))
}

/// Convert a chart result into daily records; null closes are skipped.
fn chart_records(result: YahooResult) -> Vec<RawRecord> {
    let timestamps = result.timestamp.unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next();
    let (closes, volumes) = match quote {
        Some(q) => (q.close.unwrap_or_default(), q.volume.unwrap_or_default()),
        None => (Vec::new(), Vec::new()),
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let close = closes.get(i).copied().flatten().filter(|c| *c > 0.0)?;
            let date = chrono::DateTime::from_timestamp(ts, 0)?.date_naive();
            let mut record = RawRecord::new();
            record.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
            record.insert("close".to_string(), json!(close));
            if let Some(volume) = volumes.get(i).copied().flatten() {
                record.insert("volume".to_string(), json!(volume));
            }
            Some(record)
        })
        .collect()
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Yahoo Finance API client.
pub struct YahooFinanceClient {
    client: Client,
    retries: u32,
}

impl YahooFinanceClient {
    pub fn new(timeout: Duration, retries: u32) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;
        Ok(Self { client, retries })
    }

    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Self::new(Duration::from_secs(config.http_timeout_secs), config.fetch_retries)
    }

    async fn get_chart(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<YahooResult, SourceError> {
        let url = format!(
            "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d&includePrePost=false",
            ticker,
            epoch_seconds(start),
            // period2 is exclusive
            epoch_seconds(end) + 86_400
        );
        debug!("Fetching Yahoo Finance data: {}", url);

        let url = url.as_str();
        let response: YahooChartResponse = with_retries(self.retries, ticker, move || async move {
            let response = self.client.get(url).send().await?;
            if !response.status().is_success() {
                return Err(SourceError::Api(format!("Yahoo returned {}", response.status())));
            }
            response
                .json::<YahooChartResponse>()
                .await
                .map_err(|e| SourceError::Parse(e.to_string()))
        })
        .await?;

        chart_result(response)
    }
}

#[async_trait]
impl MarketDataSource for YahooFinanceClient {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        let ticker = yahoo_ticker(request.kind, &request.code)?;
        let result = self.get_chart(&ticker, request.start, request.end).await?;
        let records = chart_records(result);
        if records.is_empty() {
            return Err(SourceError::Empty(request.code.clone()));
        }
        Ok(RawSeries::new(records))
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        let ticker = yahoo_ticker(kind, code)?;
        let today = chrono::Utc::now().date_naive();
        let meta = self.get_chart(&ticker, today - chrono::Duration::days(7), today).await?.meta;

        let mut info = InstrumentInfo::bare(code);
        info.name = meta.long_name.or(meta.short_name);
        info.details.insert("ticker".to_string(), meta.symbol);
        if let Some(exchange) = meta.exchange_name {
            info.details.insert("exchange".to_string(), exchange);
        }
        if let Some(currency) = meta.currency {
            info.details.insert("currency".to_string(), currency);
        }
        Ok(info)
    }
}
