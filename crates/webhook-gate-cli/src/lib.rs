//! # Webhook Gate CLI
//!
//! Developer tooling around the admission core.
//!
//! This module provides CLI commands for:
//! - Signing a payload the way a sender would
//! - Verifying a signature offline
//! - Sending a signed payload to a running gateway
//! - Validating a service configuration file

use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook_gate_api::{ConfigError, ServiceConfig};
use webhook_gate_core::{
    read_capped, GateError, RequestHeaders, SecretValue, SignatureScheme, SignatureVerifier,
    DEFAULT_MAX_BODY_SIZE,
};

// ============================================================================
// CLI Structure
// ============================================================================

/// Webhook Gate CLI - sign, verify and send webhooks
#[derive(Parser)]
#[command(name = "webhook-gate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Developer tools for the webhook gateway")]
pub struct Cli {
    /// Logging level
    #[arg(short, long, default_value = "warn")]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compute the signature header value for a payload
    Sign {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Check a signature header value against a payload
    Verify {
        #[command(flatten)]
        payload: PayloadArgs,

        /// Signature header value, e.g. `v1=<hex>,v1=<hex>`
        #[arg(long)]
        signature: String,
    },

    /// Sign a payload and POST it to a gateway
    Send {
        /// Gateway URL
        url: String,

        #[command(flatten)]
        payload: PayloadArgs,

        /// Extra header as `Name: value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Content type of the payload
        #[arg(long, default_value = "application/json")]
        content_type: String,
    },

    /// Validate a service configuration file
    CheckConfig {
        /// Configuration file (YAML)
        file: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Secret, scheme and payload shared by the signing commands
#[derive(clap::Args, Debug, Clone)]
pub struct PayloadArgs {
    /// Signature scheme
    #[arg(short, long, value_enum, default_value = "pagerduty")]
    pub scheme: SchemeArg,

    /// Webhook secret
    #[arg(long, env = "WEBHOOK_GATE_SECRET", hide_env_values = true)]
    pub secret: String,

    /// Payload file; standard input when omitted
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Maximum payload size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_SIZE)]
    pub max_body_size: usize,
}

/// Signature schemes selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum SchemeArg {
    /// `X-PagerDuty-Signature: v1=<hex>`
    Pagerduty,
    /// `X-Hub-Signature-256: sha256=<hex>`
    Github,
    /// `X-Hub-Signature: sha1=<hex>`
    GithubLegacy,
}

impl From<SchemeArg> for SignatureScheme {
    fn from(arg: SchemeArg) -> Self {
        match arg {
            SchemeArg::Pagerduty => SignatureScheme::PagerDuty,
            SchemeArg::Github => SignatureScheme::GitHub,
            SchemeArg::GithubLegacy => SignatureScheme::GitHubLegacy,
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Rejected: {0}")]
    Rejected(#[from] GateError),

    #[error("Request failed: {message}")]
    RequestFailed { message: String },

    #[error("Invalid argument: {arg} - {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Rejected(_) => 2,
            Self::RequestFailed { .. } => 3,
            Self::InvalidArgument { .. } => 4,
            Self::Io(_) => 5,
        }
    }
}

// ============================================================================
// Command output
// ============================================================================

/// Result of the `sign` command
#[derive(Debug, Serialize)]
pub struct SignOutput {
    pub header: String,
    pub signature: String,
}

/// Result of the `check-config` command
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub valid: bool,
    pub scheme: String,
    pub signature_header: String,
    pub event_type_header: Option<String>,
    pub custom_header: Option<String>,
    pub allowed_event_types: Vec<String>,
    pub max_body_size: usize,
    pub port: u16,
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();
    initialize_logging(&cli);

    let output = execute(cli.command).await?;
    println!("{}", output);
    Ok(())
}

/// Run one command and return what it prints
pub async fn execute(command: Commands) -> Result<String, CliError> {
    match command {
        Commands::Sign { payload, format } => {
            let signed = sign_payload(&payload).await?;
            render(&signed, format, |s| s.signature.clone())
        }
        Commands::Verify { payload, signature } => {
            verify_payload(&payload, &signature).await?;
            Ok("signature is valid".to_string())
        }
        Commands::Send {
            url,
            payload,
            headers,
            content_type,
        } => send_payload(&url, &payload, &headers, &content_type).await,
        Commands::CheckConfig { file, format } => {
            let summary = check_config(&file)?;
            render(&summary, format, |s| {
                format!(
                    "configuration is valid (scheme: {}, port: {}, max body: {} bytes)",
                    s.scheme, s.port, s.max_body_size
                )
            })
        }
    }
}

fn initialize_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("webhook_gate_cli={}", cli.log_level).into());

    // Diagnostics go to stderr so command output stays pipeable.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            cli.json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .try_init();
}

fn render<T: Serialize>(
    value: &T,
    format: OutputFormat,
    text: impl FnOnce(&T) -> String,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(text(value)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| CliError::InvalidArgument {
                arg: "format".to_string(),
                message: e.to_string(),
            })
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// Read the payload from the input file or standard input
pub async fn read_payload(payload: &PayloadArgs) -> Result<Bytes, CliError> {
    let body = match &payload.input {
        Some(path) => {
            let file = tokio::fs::File::open(path).await?;
            read_capped(file, payload.max_body_size).await?
        }
        None => read_capped(tokio::io::stdin(), payload.max_body_size).await?,
    };

    debug!(bytes = body.len(), "Read payload");
    Ok(body)
}

fn secret_of(payload: &PayloadArgs) -> Result<SecretValue, CliError> {
    if payload.secret.is_empty() {
        return Err(CliError::InvalidArgument {
            arg: "secret".to_string(),
            message: "secret cannot be empty".to_string(),
        });
    }
    Ok(SecretValue::from_string(payload.secret.clone()))
}

/// Sign the payload
pub async fn sign_payload(payload: &PayloadArgs) -> Result<SignOutput, CliError> {
    let secret = secret_of(payload)?;
    let body = read_payload(payload).await?;
    let scheme = SignatureScheme::from(payload.scheme);

    Ok(SignOutput {
        header: scheme.signature_header().to_string(),
        signature: scheme.sign(secret.expose_bytes(), &body)?,
    })
}

/// Verify `signature` against the payload with the gateway's verifier
pub async fn verify_payload(payload: &PayloadArgs, signature: &str) -> Result<(), CliError> {
    let secret = secret_of(payload)?;
    let body = read_payload(payload).await?;
    let scheme = SignatureScheme::from(payload.scheme);

    let headers = RequestHeaders::from_pairs([(scheme.signature_header(), signature)]);
    SignatureVerifier::new(scheme).verify(&headers, &body, &secret)?;
    Ok(())
}

/// Parse a `Name: value` header argument
pub fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    match raw.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CliError::InvalidArgument {
            arg: "header".to_string(),
            message: format!("expected 'Name: value', got '{}'", raw),
        }),
    }
}

/// Sign the payload and POST it, returning the response body
pub async fn send_payload(
    url: &str,
    payload: &PayloadArgs,
    headers: &[String],
    content_type: &str,
) -> Result<String, CliError> {
    let extra_headers = headers
        .iter()
        .map(|h| parse_header(h))
        .collect::<Result<Vec<_>, _>>()?;

    let secret = secret_of(payload)?;
    let body = read_payload(payload).await?;
    let scheme = SignatureScheme::from(payload.scheme);
    let signature = scheme.sign(secret.expose_bytes(), &body)?;

    let mut request = reqwest::Client::new()
        .post(url)
        .header("Content-Type", content_type)
        .header(scheme.signature_header(), signature);
    for (name, value) in extra_headers {
        request = request.header(name, value);
    }

    info!(url = %url, scheme = %scheme, bytes = body.len(), "Sending signed webhook");

    let response = request
        .body(body)
        .send()
        .await
        .map_err(|e| CliError::RequestFailed {
            message: e.to_string(),
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| CliError::RequestFailed {
        message: e.to_string(),
    })?;

    if !status.is_success() {
        return Err(CliError::RequestFailed {
            message: format!("{}: {}", status, text),
        });
    }

    Ok(text)
}

/// Load a configuration file and validate it
pub fn check_config(file: &Path) -> Result<ConfigSummary, CliError> {
    let service_config: ServiceConfig = config::Config::builder()
        .add_source(
            config::File::with_name(&file.to_string_lossy())
                .required(true)
                .format(config::FileFormat::Yaml),
        )
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

    let pipeline = service_config.build_pipeline()?;

    Ok(ConfigSummary {
        valid: true,
        scheme: pipeline.scheme().to_string(),
        signature_header: pipeline.signature_header().to_string(),
        event_type_header: pipeline
            .admission_filter()
            .event_type_header()
            .map(str::to_string),
        custom_header: service_config.gateway.custom_header.name.clone(),
        allowed_event_types: service_config.gateway.allowed_event_types.clone(),
        max_body_size: pipeline.max_body_size(),
        port: service_config.server.port,
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
