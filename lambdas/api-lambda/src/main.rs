use std::sync::Arc;

use dayplan_shared::{config::AppConfig, AppState};
use lambda_http::{run, service_fn, Error, Request};

mod http_handler;
use http_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(false)
        .without_time()
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");
    let state = Arc::new(AppState::from_config(&config)?);

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
