use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use advisorbook::config::AppConfig;
use advisorbook::db;
use advisorbook::handlers;
use advisorbook::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let state = if config.uses_remote_api() {
        tracing::info!("using remote booking API (url: {})", config.remote_api_url);
        AppState::with_remote(config.clone())
    } else {
        tracing::info!("using local sqlite database (path: {})", config.database_url);
        let conn = db::init_db(&config.database_url)?;
        AppState::with_sqlite(config.clone(), conn)
    };

    if config.public_pipeline().is_none() {
        tracing::warn!("PUBLIC_PIPELINE_ID/PUBLIC_STAGE_ID not set, public bookings will be rejected");
    }

    let app = handlers::router(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
