mod app;
mod auth;
mod config;
mod db;
mod error;
mod extractors;
mod state;
mod users;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let default_filter = if config.is_production() {
        "user_service=info,axum=warn,tower_http=info,sqlx=warn"
    } else {
        "user_service=debug,axum=info,tower_http=info,sqlx=info"
    };
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let db = db::connect(&config).await?;
    let state = AppState::init(config, db)?;
    let config = state.config.clone();

    app::serve(app::build_app(state), &config).await
}
