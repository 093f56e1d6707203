//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        DbAdapter, EmailRelayAdapter, OpenAiAssistantAdapter, TwilioSmsAdapter,
        UnconfiguredAssistant,
    },
    config::Config,
    error::ApiError,
    jobs::spawn_cleanup_jobs,
    web::{build_router, ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::Router;
use doctor_finder_core::ports::SymptomAssistantService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Resolves once Ctrl-C is received, then cancels the background jobs.
async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {}", e);
    }
    info!("Shutdown signal received.");
    token.cancel();
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let http_client = reqwest::Client::new();
    let sms_adapter = Arc::new(TwilioSmsAdapter::new(http_client.clone(), config.sms.clone()));
    let email_adapter = Arc::new(EmailRelayAdapter::new(http_client, config.email.clone()));

    let assistant: Arc<dyn SymptomAssistantService> = match &config.openai_api_key {
        Some(api_key) => {
            let openai_client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Arc::new(OpenAiAssistantAdapter::new(
                openai_client,
                config.assistant_model.clone(),
            ))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; the symptom assistant will answer with a fallback message.");
            Arc::new(UnconfiguredAssistant)
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        sms: sms_adapter,
        email: email_adapter,
        assistant,
        otp_policy: config.otp.clone(),
        clinic_offset: config.clinic_offset,
    });

    // --- 5. Start the Cleanup Jobs ---
    let shutdown = CancellationToken::new();
    let jobs = spawn_cleanup_jobs(app_state.db.clone(), &config.otp, shutdown.clone());

    // --- 6. Create the Web Router ---
    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(build_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    for job in jobs {
        if let Err(e) = job.await {
            warn!("Cleanup job ended abnormally: {}", e);
        }
    }
    info!("Server stopped.");
    Ok(())
}
