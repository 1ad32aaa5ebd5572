//! EastMoney client for A-share klines, fund NAV history and identity data.
//!
//! Equity and index history comes from the push2his kline endpoint and is
//! emitted with the exchange export's Chinese column names. Fund history
//! comes from the paged NAV endpoint, which insists on a fund-site Referer.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{exchange_of, with_retries, MarketDataSource, SeriesRequest};
use crate::config::Config;
use crate::error::SourceError;
use crate::types::{InstrumentInfo, InstrumentKind, RawRecord, RawSeries};

const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";
const FUND_NAV_URL: &str = "https://api.fund.eastmoney.com/f10/lsjz";
const FUND_INFO_URL: &str = "https://fundmobapi.eastmoney.com/FundMApi/FundBaseTypeInformation.ashx";
const FUND_REFERER: &str = "https://fundf10.eastmoney.com/";

const NAV_PAGE_SIZE: usize = 20;
const MAX_NAV_PAGES: usize = 400;

/// Map an instrument code to EastMoney's `market.code` security id.
///
/// Shanghai is market 1 and Shenzhen market 0; see [`exchange_of`].
pub fn secid(kind: InstrumentKind, code: &str) -> String {
    let (bare, shanghai) = exchange_of(kind, code);
    format!("{}.{}", if shanghai { 1 } else { 0 }, bare)
}

/// Parse a kline response into the exchange export schema.
///
/// Each kline is `date,open,close,high,low,volume[,amount,...]`.
pub fn parse_klines(code: &str, body: &Value) -> Result<RawSeries, SourceError> {
    let data = &body["data"];
    if data.is_null() {
        return Err(SourceError::Empty(code.to_string()));
    }
    let klines = data["klines"]
        .as_array()
        .ok_or_else(|| SourceError::Parse("missing klines array".to_string()))?;

    let records: Vec<RawRecord> = klines
        .iter()
        .filter_map(|line| line.as_str())
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 6 {
                return None;
            }
            let mut record = RawRecord::new();
            record.insert("日期".to_string(), json!(parts[0]));
            record.insert("开盘".to_string(), json!(parts[1]));
            record.insert("收盘".to_string(), json!(parts[2]));
            record.insert("最高".to_string(), json!(parts[3]));
            record.insert("最低".to_string(), json!(parts[4]));
            record.insert("成交量".to_string(), json!(parts[5]));
            Some(record)
        })
        .collect();

    if records.is_empty() {
        return Err(SourceError::Empty(code.to_string()));
    }
    Ok(RawSeries::new(records))
}

/// Parse one page of fund NAV history; returns the rows and the total count.
pub fn parse_nav_page(body: &Value) -> Result<(Vec<RawRecord>, usize), SourceError> {
    if let Some(message) = body["ErrMsg"].as_str().filter(|m| !m.is_empty()) {
        return Err(SourceError::Api(message.to_string()));
    }
    let rows = body["Data"]["LSJZList"]
        .as_array()
        .ok_or_else(|| SourceError::Parse("missing LSJZList".to_string()))?;
    let total = body["TotalCount"].as_u64().unwrap_or(rows.len() as u64) as usize;

    let records = rows
        .iter()
        .map(|row| {
            let mut record = RawRecord::new();
            record.insert("净值日期".to_string(), row["FSRQ"].clone());
            record.insert("单位净值".to_string(), row["DWJZ"].clone());
            record.insert("累计净值".to_string(), row["LJJZ"].clone());
            record
        })
        .collect();

    Ok((records, total))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() && s != "--" => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse the quote endpoint's identity fields (`f57` code, `f58` name).
pub fn parse_stock_info(code: &str, body: &Value) -> Result<InstrumentInfo, SourceError> {
    let data = &body["data"];
    if data.is_null() {
        return Err(SourceError::Empty(code.to_string()));
    }

    let mut info = InstrumentInfo::bare(code);
    info.name = text(&data["f58"]);
    for (field, label) in [("f57", "exchange_code"), ("f84", "total_shares"), ("f116", "market_cap")] {
        if let Some(value) = text(&data[field]) {
            info.details.insert(label.to_string(), value);
        }
    }
    Ok(info)
}

/// Parse the fund base-info endpoint.
pub fn parse_fund_info(code: &str, body: &Value) -> Result<InstrumentInfo, SourceError> {
    let data = &body["Datas"];
    if data.is_null() {
        return Err(SourceError::Empty(code.to_string()));
    }

    let mut info = InstrumentInfo::bare(code);
    info.name = text(&data["SHORTNAME"]);
    let fields = [
        ("FTYPE", "fund_type"),
        ("JJGS", "company"),
        ("JJJL", "manager"),
        ("ESTABDATE", "inception"),
        ("RISKLEVEL", "risk_level"),
    ];
    for (field, label) in fields {
        if let Some(value) = text(&data[field]) {
            info.details.insert(label.to_string(), value);
        }
    }
    Ok(info)
}

/// EastMoney HTTP client.
pub struct EastMoneyClient {
    client: Client,
    retries: u32,
}

impl EastMoneyClient {
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

    async fn get_json(&self, url: &str, query: &[(&str, String)], referer: Option<&str>) -> Result<Value, SourceError> {
        with_retries(self.retries, url, move || async move {
            let mut request = self.client.get(url).query(query);
            if let Some(referer) = referer {
                request = request.header(reqwest::header::REFERER, referer);
            }
            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(SourceError::Api(format!("{} returned {}", url, response.status())));
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| SourceError::Parse(e.to_string()))
        })
        .await
    }

    /// Forward-adjusted daily klines for an equity or index.
    pub async fn get_daily_klines(
        &self,
        kind: InstrumentKind,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, SourceError> {
        let query = [
            ("secid", secid(kind, code)),
            ("fields1", "f1,f2,f3,f4,f5,f6".to_string()),
            ("fields2", "f51,f52,f53,f54,f55,f56,f57".to_string()),
            ("klt", "101".to_string()),
            ("fqt", "1".to_string()),
            ("beg", start.format("%Y%m%d").to_string()),
            ("end", end.format("%Y%m%d").to_string()),
        ];
        debug!("Fetching EastMoney klines for {}", code);
        let body = self.get_json(KLINE_URL, &query, None).await?;
        parse_klines(code, &body)
    }

    /// Daily NAV history of a fund, all pages.
    pub async fn get_fund_nav(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<RawSeries, SourceError> {
        let mut records = Vec::new();
        for page in 1..=MAX_NAV_PAGES {
            let query = [
                ("fundCode", code.to_string()),
                ("pageIndex", page.to_string()),
                ("pageSize", NAV_PAGE_SIZE.to_string()),
                ("startDate", start.format("%Y-%m-%d").to_string()),
                ("endDate", end.format("%Y-%m-%d").to_string()),
            ];
            let body = self.get_json(FUND_NAV_URL, &query, Some(FUND_REFERER)).await?;
            let (rows, total) = parse_nav_page(&body)?;
            let exhausted = rows.is_empty();
            records.extend(rows);
            if exhausted || records.len() >= total {
                break;
            }
        }

        debug!("Fetched {} NAV rows for fund {}", records.len(), code);
        if records.is_empty() {
            return Err(SourceError::Empty(code.to_string()));
        }
        Ok(RawSeries::new(records))
    }

    pub async fn get_stock_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        let query = [("secid", secid(kind, code)), ("fields", "f57,f58,f84,f116".to_string())];
        let body = self.get_json(QUOTE_URL, &query, None).await?;
        parse_stock_info(code, &body)
    }

    pub async fn get_fund_info(&self, code: &str) -> Result<InstrumentInfo, SourceError> {
        let query = [
            ("FCODE", code.to_string()),
            ("deviceid", "Wap".to_string()),
            ("plat", "Wap".to_string()),
            ("product", "EFund".to_string()),
            ("version", "2.0.0".to_string()),
        ];
        let body = self.get_json(FUND_INFO_URL, &query, None).await?;
        parse_fund_info(code, &body)
    }
}

#[async_trait]
impl MarketDataSource for EastMoneyClient {
    fn name(&self) -> &'static str {
        "eastmoney"
    }

    async fn fetch_daily(&self, request: &SeriesRequest) -> Result<RawSeries, SourceError> {
        match request.kind {
            InstrumentKind::Fund => self.get_fund_nav(&request.code, request.start, request.end).await,
            InstrumentKind::Equity | InstrumentKind::Index => {
                self.get_daily_klines(request.kind, &request.code, request.start, request.end)
                    .await
            }
        }
    }

    async fn fetch_info(
        &self,
        kind: InstrumentKind,
        code: &str,
    ) -> Result<InstrumentInfo, SourceError> {
        match kind {
            InstrumentKind::Fund => self.get_fund_info(code).await,
            InstrumentKind::Equity | InstrumentKind::Index => {
                self.get_stock_info(kind, code).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secid_mapping() {
        assert_eq!(secid(InstrumentKind::Equity, "600519"), "1.600519");
        assert_eq!(secid(InstrumentKind::Equity, "900901"), "1.900901");
        assert_eq!(secid(InstrumentKind::Equity, "000001"), "0.000001");
        assert_eq!(secid(InstrumentKind::Equity, "300750"), "0.300750");
        assert_eq!(secid(InstrumentKind::Index, "sh000300"), "1.000300");
        assert_eq!(secid(InstrumentKind::Index, "SZ399001"), "0.399001");
    }

    #[test]
    fn test_secid_bare_shanghai_indices() {
        assert_eq!(secid(InstrumentKind::Index, "000300"), "1.000300");
        assert_eq!(secid(InstrumentKind::Index, "000905"), "1.000905");
        assert_eq!(secid(InstrumentKind::Index, "000001"), "1.000001");
        assert_eq!(secid(InstrumentKind::Index, "399006"), "0.399006");
    }

    #[test]
    fn test_parse_klines() {
        let body = json!({
            "data": {
                "code": "600519",
                "klines": [
                    "2024-01-02,1685.00,1700.00,1710.00,1680.00,32000,5.4e9",
                    "2024-01-03,1700.00,1695.50,1705.00,1690.00,28000,4.7e9",
                    "garbage"
                ]
            }
        });
        let raw = parse_klines("600519", &body).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.records[0]["日期"], "2024-01-02");
        assert_eq!(raw.records[1]["收盘"], "1695.50");
        assert_eq!(raw.records[1]["成交量"], "28000");
    }

    #[test]
    fn test_parse_klines_null_data() {
        let body = json!({ "rc": 0, "data": null });
        assert!(matches!(parse_klines("999999", &body), Err(SourceError::Empty(_))));
    }

    #[test]
    fn test_parse_nav_page() {
        let body = json!({
            "Data": {
                "LSJZList": [
                    { "FSRQ": "2024-01-05", "DWJZ": "1.2345", "LJJZ": "2.1000" },
                    { "FSRQ": "2024-01-04", "DWJZ": "1.2300", "LJJZ": "2.0955" }
                ]
            },
            "ErrCode": 0,
            "ErrMsg": null,
            "TotalCount": 730
        });
        let (rows, total) = parse_nav_page(&body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(total, 730);
        assert_eq!(rows[0]["净值日期"], "2024-01-05");
        assert_eq!(rows[0]["单位净值"], "1.2345");
    }

    #[test]
    fn test_parse_nav_page_error() {
        let body = json!({ "Data": null, "ErrMsg": "invalid fund code" });
        assert!(matches!(parse_nav_page(&body), Err(SourceError::Api(_))));
    }

    #[test]
    fn test_parse_stock_info() {
        let body = json!({ "data": { "f57": "600519", "f58": "贵州茅台", "f84": 1256197800.0 } });
        let info = parse_stock_info("600519", &body).unwrap();
        assert_eq!(info.name.as_deref(), Some("贵州茅台"));
        assert_eq!(info.details["exchange_code"], "600519");
        assert!(info.details.contains_key("total_shares"));
        assert!(!info.details.contains_key("market_cap"));
    }

    #[test]
    fn test_parse_fund_info() {
        let body = json!({
            "Datas": {
                "FCODE": "161725",
                "SHORTNAME": "招商中证白酒指数(LOF)A",
                "FTYPE": "指数型-股票",
                "JJGS": "招商基金",
                "JJJL": "侯昊",
                "ESTABDATE": "--"
            }
        });
        let info = parse_fund_info("161725", &body).unwrap();
        assert_eq!(info.name.as_deref(), Some("招商中证白酒指数(LOF)A"));
        assert_eq!(info.details["manager"], "侯昊");
        assert!(!info.details.contains_key("inception"));
    }
}
