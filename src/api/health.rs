use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    source: &'static str,
    benchmark: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        source: state.analyzer.source_name(),
        benchmark: state.config.benchmark_index.clone(),
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::Analyzer;
    use crate::sources::{MarketDataSource, StaticSource};
    use std::sync::Arc;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "ok",
            version: "1.0.0",
            source: "eastmoney",
            benchmark: "sh000300".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"version\":\"1.0.0\""));
        assert!(json.contains("\"benchmark\":\"sh000300\""));
    }

    #[tokio::test]
    async fn test_health_handler() {
        let config = Arc::new(Config::default());
        let source: Box<dyn MarketDataSource> = Box::new(StaticSource::new());
        let analyzer = Analyzer::new(source, Config::default());
        let state = AppState {
            config,
            analyzer: Arc::new(analyzer),
        };

        let Json(response) = health(State(state)).await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(response.source, "static");
    }
}
