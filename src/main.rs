use stagewise::config::Config;
use stagewise::sources::{EastMoneyClient, FallbackSource, MarketDataSource, YahooFinanceClient};
use stagewise::{app, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagewise=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();
    info!("Starting Stagewise server on {}:{}", config.host, config.port);

    // East Money is the primary source; Yahoo Finance backs up equities and indices
    let eastmoney = EastMoneyClient::from_config(&config)?;
    let source: Box<dyn MarketDataSource> = if config.yahoo_fallback {
        info!("Yahoo Finance fallback enabled");
        Box::new(FallbackSource::new(eastmoney, YahooFinanceClient::from_config(&config)?))
    } else {
        Box::new(eastmoney)
    };

    let addr = format!("{}:{}", config.host, config.port);
    let app = app(AppState::new(config, source));

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Stagewise server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
