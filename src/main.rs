mod app;
mod auth;
mod config;
mod error;
mod payload;
mod recipes;
mod state;
mod store;
mod tags;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipebook=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    if let Some(admin) = app_state.config.admin.clone() {
        auth::services::ensure_superuser(app_state.store.as_ref(), &admin.email, &admin.password)
            .await
            .map_err(|e| anyhow::anyhow!("bootstrapping superuser: {e}"))?;
    }

    let config = app_state.config.clone();
    let app = app::build_app(app_state);
    app::serve(app, &config).await
}
