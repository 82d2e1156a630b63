//! services/gateway/src/bin/gateway.rs

use gateway_lib::{
    config::Config,
    error::GatewayError,
    web::{self, state::AppState, ApiDoc},
};
use axum::Router;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting gateway...");
    info!(
        "Allowed origins: {}",
        config.allowed_origins.join(", ")
    );

    // --- 2. Build the Shared AppState ---
    let bind_address = config.bind_address;
    let state = Arc::new(AppState::new(config)?);

    // --- 3. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(web::router(state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 4. Start the Server ---
    info!("Starting gateway on {}", bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        bind_address
    );
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
