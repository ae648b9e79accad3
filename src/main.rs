mod app;
mod config;
mod error;
mod interactions;
mod ledger;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "caltrack=debug,axum=info,tower_http=info".to_string());
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

    // migrations are embedded and applied while opening the store
    let app_state = state::AppState::init().await?;
    tracing::info!(
        database_url = %app_state.config.database_url,
        store_timeout_ms = app_state.config.store.timeout.as_millis() as u64,
        "ledger store opened"
    );

    app::serve(app::build_app(app_state)).await
}
