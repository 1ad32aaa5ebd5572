use crate::error::{AppError, Result};
use crate::types::{EquityReport, FundReport};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub meta: ApiMeta,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// Data source the report was built from.
    pub source: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct FundQuery {
    pub benchmark: Option<String>,
}

impl<T> ApiResponse<T> {
    fn new(data: T, source: &'static str) -> Self {
        Self {
            data,
            meta: ApiMeta { source },
        }
    }
}

/// Codes go to the data source as given; only blank ones are refused.
fn require_code(code: &str) -> Result<&str> {
    let code = code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("instrument code is empty".to_string()));
    }
    Ok(code)
}

/// GET /api/equity/:code
async fn get_equity(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<EquityReport>>> {
    let code = require_code(&code)?;
    let report = state
        .analyzer
        .try_analyze_equity(code)
        .await
        .map_err(|e| AppError::analysis(code, e))?;
    Ok(Json(ApiResponse::new(report, state.analyzer.source_name())))
}

/// GET /api/fund/:code?benchmark=sh000905
async fn get_fund(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<FundQuery>,
) -> Result<Json<ApiResponse<FundReport>>> {
    let code = require_code(&code)?;
    let report = state
        .analyzer
        .try_analyze_fund(code, params.benchmark.as_deref())
        .await
        .map_err(|e| AppError::analysis(code, e))?;
    Ok(Json(ApiResponse::new(report, state.analyzer.source_name())))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/equity/:code", get(get_equity))
        .route("/fund/:code", get(get_fund))
}
