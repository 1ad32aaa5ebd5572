//! Stagewise - weekly trend-stage analysis and position advice for A-share
//! equities and mutual funds.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use axum::Router;
use config::Config;
use services::Analyzer;
use sources::MarketDataSource;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Analyzer over whichever data source the server was configured with.
pub type SharedAnalyzer = Analyzer<Box<dyn MarketDataSource>>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub analyzer: Arc<SharedAnalyzer>,
}

impl AppState {
    pub fn new(config: Config, source: Box<dyn MarketDataSource>) -> Self {
        let analyzer = Analyzer::new(source, config.clone());
        Self {
            config: Arc::new(config),
            analyzer: Arc::new(analyzer),
        }
    }
}

/// Build the HTTP application with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub use error::{AnalysisError, AppError, SourceError};
pub use types::*;
