//! dirgate authorization API server
//!
//! Answers two questions for its callers: who is this token for, and what can
//! they do? Identity data comes from the configured directory; resolved
//! authorization documents are cached with single-flight refresh.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! cargo run --bin dirgate-server
//!
//! # Start on custom host and port
//! cargo run --bin dirgate-server -- --host 127.0.0.1 --port 9090
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run --bin dirgate-server
//! ```
//!
//! Service configuration (ACL, rate limits, TTLs, token expectations) is
//! environment-driven; see `Settings`.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dirgate_api_server::server::ServerBuilder;
use dirgate_api_server::state::AppState;
use dirgate_authz::cache::{CacheConfig, CacheStore};
use dirgate_authz::mapper::{DerivationTable, EffectiveAuthMapper};
use dirgate_authz::service::AuthzService;
use dirgate_authz::session::SessionManager;
use dirgate_authz::token::{IdTokenConfig, TokenValidator};
use dirgate_authz::{NetworkAcl, RateLimiter, StaticDirectoryFetcher};
use dirgate_core::Settings;
use jsonwebtoken::{Algorithm, DecodingKey};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// dirgate authorization API server
#[derive(Parser, Debug)]
#[command(
    name = "dirgate-server",
    version,
    about = "Directory-backed authorization decision service",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "API_SERVER_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "API_SERVER_PORT")]
    port: u16,

    /// Enable JSON logging format
    #[arg(long, env = "API_SERVER_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Seconds between cache/limiter sweep passes
    #[arg(long, default_value = "60", env = "API_SERVER_SWEEP_INTERVAL")]
    sweep_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    info!("Starting dirgate authorization server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::from_env().context("Configuration error")?;
    let service = Arc::new(build_service(&settings)?);
    info!("Authorization engine initialized");

    spawn_sweeper(Arc::clone(&service), args.sweep_interval);

    let state = AppState::new(service, settings.acl_reject_as_not_found);
    let server = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .state(state)
        .build()?;

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wire the engine components from settings
fn build_service(settings: &Settings) -> Result<AuthzService> {
    let acl = NetworkAcl::parse(&settings.allowed_networks).context("Invalid network ACL")?;

    let limiter = RateLimiter::new(
        settings.rate_limit_requests,
        Duration::from_secs(settings.rate_limit_window_seconds),
    );

    let sessions = Arc::new(SessionManager::new(
        &settings.session_signing_secret,
        settings.session_ttl_seconds,
        settings.session_refresh_threshold_seconds,
    ));

    let (decoding_key, algorithm) = id_token_key(settings)?;
    let validator = TokenValidator::new(
        IdTokenConfig {
            decoding_key,
            algorithm,
            expected_issuer: settings.expected_issuer.clone(),
            allowed_audiences: settings.allowed_audiences.clone(),
            allowed_hosted_domain: settings.allowed_hosted_domain.clone(),
        },
        Arc::clone(&sessions),
    );

    let rules = match &settings.derived_rules_file {
        Some(path) => {
            let table = DerivationTable::load(path).context("Invalid derivation rules")?;
            info!(rules = table.len(), path = %path.display(), "Loaded derived-permission rules");
            table
        }
        None => DerivationTable::empty(),
    };
    let mapper = Arc::new(EffectiveAuthMapper::new(rules));

    let fetcher = match &settings.directory_fixture_file {
        Some(path) => {
            let fetcher =
                StaticDirectoryFetcher::load(path).context("Invalid directory fixture")?;
            info!(principals = fetcher.len(), path = %path.display(), "Loaded directory fixture");
            Arc::new(fetcher)
        }
        None => bail!(
            "DIRECTORY_FIXTURE_FILE is required: this build ships the fixture-backed \
             directory; plug a real client into the DirectoryFetcher seam for production"
        ),
    };

    let cache = Arc::new(CacheStore::new(
        CacheConfig {
            ttl: Duration::from_secs(settings.effectiveauth_ttl_seconds),
            stale_grace: Duration::from_secs(settings.stale_grace_seconds),
        },
        fetcher,
        mapper,
    ));

    Ok(AuthzService::new(acl, limiter, validator, cache, sessions))
}

/// Resolve the identity-token verification key from settings
fn id_token_key(settings: &Settings) -> Result<(DecodingKey, Algorithm)> {
    if let Some(path) = &settings.id_token_public_key_file {
        let pem = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let key = DecodingKey::from_rsa_pem(&pem).context("Invalid id-token public key")?;
        return Ok((key, Algorithm::RS256));
    }
    if let Some(secret) = &settings.id_token_hs_secret {
        warn!("Using shared-secret id-token verification; intended for dev/test only");
        return Ok((DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256));
    }
    bail!("Either ID_TOKEN_PUBLIC_KEY_FILE or ID_TOKEN_HS_SECRET must be configured")
}

/// Periodic low-priority sweep: expired cache entries and idle rate counters
fn spawn_sweeper(service: Arc<AuthzService>, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let swept = service.cache().sweep_expired();
            service.limiter().evict_stale();
            if swept > 0 {
                info!(swept, "Swept expired cache entries");
            }
        }
    });
}

/// Initialize tracing/logging subsystem
fn init_tracing(args: &Args) -> Result<()> {
    let log_level = args.log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        tracing::Level::INFO
    });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "dirgate_api_server={},dirgate_authz={},tower_http=info",
            log_level, log_level
        )
        .into()
    });

    if args.json_logs {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(vec!["dirgate-server"]);
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 8080);
        assert!(!args.json_logs);
        assert_eq!(args.log_level, "info");
        assert_eq!(args.sweep_interval, 60);
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(vec![
            "dirgate-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--json-logs",
        ]);
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 9090);
        assert!(args.json_logs);
    }
}
