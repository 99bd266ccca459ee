//! # Webhook Gate Service
//!
//! Binary entry point for the webhook gateway.
//!
//! This executable:
//! - Loads configuration once from files and environment
//! - Initializes logging
//! - Builds the admission pipeline
//! - Starts the HTTP server from webhook-gate-api

mod loader;

use loader::{load_service, ConfigSources};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook_gate_api::{start_server, LoggingConfig, ServiceError};

#[tokio::main]
async fn main() {
    let loaded = match load_service(&ConfigSources::default()) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_tracing(&LoggingConfig::default());
            error!(error = %e, "Service configuration is invalid; aborting");
            std::process::exit(3);
        }
    };

    init_tracing(&loaded.config.logging);
    info!(
        config_file = loaded.config_file.as_deref().unwrap_or("none"),
        "Starting Webhook Gate Service"
    );

    let service_config = loaded.config;
    let pipeline = loaded.pipeline;

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        scheme = %pipeline.scheme(),
        max_body_size = pipeline.max_body_size(),
        "Starting HTTP server"
    );

    if let Err(e) = start_server(&service_config.server, pipeline).await {
        error!("Server stopped with error: {}", e);

        let exit_code = match e {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
        };

        std::process::exit(exit_code);
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "webhook_gate_service={0},webhook_gate_api={0},webhook_gate_core={0},tower_http=debug",
            logging.level
        )
        .into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            logging
                .json_format
                .then(|| tracing_subscriber::fmt::layer().json()),
        )
        .with((!logging.json_format).then(tracing_subscriber::fmt::layer))
        .init();
}
