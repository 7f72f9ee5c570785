// # tunnel-dnsd - Reconciliation Webhook Daemon
//
// The daemon is a thin integration layer: it reads configuration from
// environment variables, wires the Cloudflare provider into the
// reconciliation engine, and serves the routing collaborator's webhook
// protocol over HTTP. All reconciliation logic lives in tunnel-dns-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Cloudflare credentials
// - `CLOUDFLARE_API_TOKEN`: scoped API token (preferred)
// - `CLOUDFLARE_API_KEY` + `CLOUDFLARE_API_EMAIL`: legacy key auth
// - `CLOUDFLARE_ACCOUNT_ID`: account owning the tunnel (required)
// - `CLOUDFLARE_TUNNEL_ID`: tunnel to reconcile (required)
//
// ### Engine
// - `DOMAIN_FILTER`: comma-separated domain allow-list
// - `DRY_RUN`: plan but never mutate provider state (default false)
// - `SYNC_DNS`: also write the DNS changeset (default false)
//
// ### Server
// - `PORT`: listen port (default 8888)
// - `LOG_LEVEL`: trace|debug|info|warn|error (default info)
// - `LOG_FORMAT`: json|text (default json)
//
// ## Example
//
// ```bash
// export CLOUDFLARE_API_TOKEN=your_token
// export CLOUDFLARE_ACCOUNT_ID=your_account
// export CLOUDFLARE_TUNNEL_ID=your_tunnel
// export DOMAIN_FILTER=example.com
// export SYNC_DNS=true
//
// tunnel-dnsd
// ```

use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use tunnel_dns_core::{Endpoint, EndpointChanges, Reconciler, ReconcilerConfig};
use tunnel_dns_provider_cloudflare::CloudflareApi;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Media type of the routing collaborator's webhook protocol
const EXTERNAL_DNS_MEDIA_TYPE: &str = "application/external.dns.webhook+json;version=1";

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    api_token: Option<String>,
    api_key: Option<String>,
    api_email: Option<String>,
    account_id: String,
    tunnel_id: String,
    domain_filter: Vec<String>,
    dry_run: bool,
    sync_dns: bool,
    port: u16,
    log_level: String,
    log_format: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            api_token: env::var("CLOUDFLARE_API_TOKEN").ok(),
            api_key: env::var("CLOUDFLARE_API_KEY").ok(),
            api_email: env::var("CLOUDFLARE_API_EMAIL").ok(),
            account_id: env::var("CLOUDFLARE_ACCOUNT_ID").unwrap_or_default(),
            tunnel_id: env::var("CLOUDFLARE_TUNNEL_ID").unwrap_or_default(),
            domain_filter: env::var("DOMAIN_FILTER")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            dry_run: env_flag("DRY_RUN"),
            sync_dns: env_flag("SYNC_DNS"),
            port: env::var("PORT")
                .ok()
                .map(|s| s.parse().unwrap_or(8888))
                .unwrap_or(8888),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        let has_token = self.api_token.as_ref().is_some_and(|t| !t.is_empty());
        let has_key = self.api_key.as_ref().is_some_and(|k| !k.is_empty());

        if !has_token && !has_key {
            anyhow::bail!(
                "either CLOUDFLARE_API_TOKEN or CLOUDFLARE_API_KEY must be set"
            );
        }

        if has_key && self.api_email.as_ref().is_none_or(|e| e.is_empty()) {
            anyhow::bail!("CLOUDFLARE_API_EMAIL must be set when using CLOUDFLARE_API_KEY");
        }

        if self.account_id.is_empty() {
            anyhow::bail!("CLOUDFLARE_ACCOUNT_ID is required");
        }

        if self.tunnel_id.is_empty() {
            anyhow::bail!("CLOUDFLARE_TUNNEL_ID is required");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        }

        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("LOG_FORMAT '{}' is not valid. Valid formats: json, text", other),
        }

        Ok(())
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return DaemonExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let init_result = if config.log_format == "json" {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = init_result {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    info!(
        account_id = %config.account_id,
        tunnel_id = %config.tunnel_id,
        dry_run = config.dry_run,
        sync_dns = config.sync_dns,
        domain_filter = ?config.domain_filter,
        "starting tunnel-dnsd"
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {e:#}");
            DaemonExitCode::RuntimeError
        } else {
            DaemonExitCode::CleanShutdown
        }
    })
    .into()
}

#[derive(Clone)]
struct AppState {
    reconciler: Arc<Reconciler>,
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let api = match &config.api_token {
        Some(token) if !token.is_empty() => CloudflareApi::with_api_token(token.clone())?,
        _ => CloudflareApi::with_api_key(
            config.api_key.clone().unwrap_or_default(),
            config.api_email.clone().unwrap_or_default(),
        )?,
    };

    let reconciler_config = ReconcilerConfig::new(config.account_id, config.tunnel_id)
        .with_domain_filter(config.domain_filter)
        .with_dry_run(config.dry_run)
        .with_sync_dns(config.sync_dns);

    let reconciler = Reconciler::new(Arc::new(api), reconciler_config)?;

    let state = AppState {
        reconciler: Arc::new(reconciler),
    };

    let app = Router::new()
        .route("/", get(handle_negotiation))
        .route("/records", get(handle_get_records).post(handle_apply_changes))
        .route("/adjustendpoints", post(handle_adjust_endpoints))
        .route("/healthz", get(handle_healthz))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("webhook server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("webhook server stopped");
    Ok(())
}

fn webhook_json<T: serde::Serialize>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, EXTERNAL_DNS_MEDIA_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("failed to marshal response: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Advertise the domain filter to the collaborator
async fn handle_negotiation(State(state): State<AppState>) -> Response {
    webhook_json(state.reconciler.domain_filter())
}

/// Serve the endpoints derived from current tunnel ingress
async fn handle_get_records(State(state): State<AppState>) -> Response {
    match state.reconciler.routable_endpoints().await {
        Ok(endpoints) => webhook_json(&endpoints),
        Err(e) => {
            error!("failed to get records: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Apply a batch of desired endpoint changes
async fn handle_apply_changes(
    State(state): State<AppState>,
    Json(changes): Json<EndpointChanges>,
) -> Response {
    if let Err(e) = state.reconciler.apply_desired_state(&changes).await {
        error!("failed to apply changes: {e}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    StatusCode::NO_CONTENT.into_response()
}

/// Filter candidate endpoints down to the routable kind
async fn handle_adjust_endpoints(
    State(state): State<AppState>,
    Json(endpoints): Json<Vec<Endpoint>>,
) -> Response {
    webhook_json(&state.reconciler.adjust_endpoints(endpoints))
}

async fn handle_healthz() -> &'static str {
    "ok"
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGTERM handler: {e}");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to setup SIGINT handler: {e}");
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("Received SIGINT, shutting down"),
    }
}

/// Wait for CTRL-C (non-Unix platforms)
#[cfg(not(unix))]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to wait for CTRL-C: {e}");
    }
    info!("Received CTRL-C, shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_flag_accepts_common_truthy_values() {
        // SAFETY: tests in this module run in one process; the variable
        // names are test-local.
        unsafe {
            env::set_var("TUNNEL_DNSD_TEST_FLAG", "true");
        }
        assert!(env_flag("TUNNEL_DNSD_TEST_FLAG"));

        unsafe {
            env::set_var("TUNNEL_DNSD_TEST_FLAG", "0");
        }
        assert!(!env_flag("TUNNEL_DNSD_TEST_FLAG"));

        assert!(!env_flag("TUNNEL_DNSD_TEST_FLAG_UNSET"));
    }

    #[test]
    fn validate_requires_credentials_and_identifiers() {
        let config = Config {
            api_token: Some("token".to_string()),
            api_key: None,
            api_email: None,
            account_id: "account123".to_string(),
            tunnel_id: "tunnel123".to_string(),
            domain_filter: vec![],
            dry_run: false,
            sync_dns: false,
            port: 8888,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        };
        assert!(config.validate().is_ok());

        let missing_creds = Config {
            api_token: None,
            ..config
        };
        assert!(missing_creds.validate().is_err());
    }
}
