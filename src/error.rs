use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised while retrieving raw market data.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No data returned for {0}")]
    Empty(String),

    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl SourceError {
    /// Network and decoding failures are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Http(_) | SourceError::Parse(_))
    }
}

/// Failures surfaced at the analysis request boundary.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("cannot retrieve instrument data")]
    DataUnavailable,

    #[error("cannot retrieve benchmark data")]
    BenchmarkUnavailable,

    #[error("analysis failed: {0}")]
    Internal(String),
}

/// HTTP-facing error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{source}")]
    Analysis { code: String, source: AnalysisError },
}

impl AppError {
    pub fn analysis(code: &str, source: AnalysisError) -> Self {
        AppError::Analysis {
            code: code.to_string(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Analysis { code, source } => {
                let status = match source {
                    AnalysisError::DataUnavailable | AnalysisError::BenchmarkUnavailable => {
                        StatusCode::NOT_FOUND
                    }
                    AnalysisError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = Json(json!({
                    "error": source.to_string(),
                    "code": code,
                    "status": status.as_u16(),
                }));
                return (status, body).into_response();
            }
        };

        let body = Json(json!({
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_error_messages() {
        assert_eq!(
            AnalysisError::DataUnavailable.to_string(),
            "cannot retrieve instrument data"
        );
        assert_eq!(
            AnalysisError::BenchmarkUnavailable.to_string(),
            "cannot retrieve benchmark data"
        );
        assert_eq!(
            AnalysisError::Internal("boom".to_string()).to_string(),
            "analysis failed: boom"
        );
    }

    #[test]
    fn test_source_error_messages() {
        assert_eq!(
            SourceError::Empty("600519".to_string()).to_string(),
            "No data returned for 600519"
        );
        assert_eq!(
            SourceError::Api("503".to_string()).to_string(),
            "API error: 503"
        );
    }

    #[test]
    fn test_bad_request_status_code() {
        let response = AppError::BadRequest("x".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_analysis_error_status_codes() {
        let response = AppError::analysis("000001", AnalysisError::DataUnavailable).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response =
            AppError::analysis("161725", AnalysisError::BenchmarkUnavailable).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = AppError::analysis("161725", AnalysisError::Internal("boom".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_analysis_error_message() {
        let error = AppError::analysis("000001", AnalysisError::DataUnavailable);
        assert_eq!(error.to_string(), "cannot retrieve instrument data");
    }
}
