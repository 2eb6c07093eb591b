//! Application entry point for the `canal-monitor` service.
//!
//! This binary orchestrates the full startup sequence for the water-level
//! monitoring API, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Building the reading store (PostgreSQL pool + schema, or in-memory)
//! - Wiring the mailer, HIGH-alert notifier, reading service and
//!   verification-code issuer
//! - Optionally seeding demo readings
//! - Mounting all API routes via the `routes` gateway
//! - Binding the Axum HTTP server and serving until Ctrl-C
//!
//! # Environment Variables
//! See [`config::load_from_env`] for the full list. Logging is controlled by:
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//! - `FORCE_COLOR` (optional) – override TTY colour detection
use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

mod config;
mod error;
mod mailer;
mod models;
mod notifier;
mod routes;
mod schema;
mod seed;
mod service;
mod store;
mod verification;

use config::{Config, StoreBackend};
use mailer::{LogMailer, Mailer, SmtpMailer};
use notifier::EmailNotifier;
use routes::AppState;
use service::ReadingService;
use store::{MemoryReadingStore, PgReadingStore, ReadingStore};
use verification::VerificationCodes;

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let store = build_store(&cfg).await?;

    if cfg.seed_readings > 0 {
        seed::seed_readings(store.as_ref(), cfg.seed_readings, seed::today()).await?;
    }

    let mailer: Arc<dyn Mailer> = match &cfg.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp, &cfg.mail_from)?),
        None => {
            tracing::warn!("SMTP_HOST not set; outgoing mail will only be logged");
            Arc::new(LogMailer)
        }
    };

    let notifier = Arc::new(EmailNotifier::new(mailer.clone(), cfg.alert_recipient.clone()));
    let state = AppState {
        readings: Arc::new(ReadingService::new(store, notifier)),
        codes: Arc::new(VerificationCodes::new(
            mailer,
            chrono::Duration::minutes(i64::from(cfg.code_ttl_minutes)),
        )),
    };

    let app: Router = routes::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

// ---

/// Build the configured reading store.
///
/// For PostgreSQL this connects the pool and creates the schema if needed.
async fn build_store(cfg: &Config) -> Result<Arc<dyn ReadingStore>> {
    // ---
    match &cfg.store {
        StoreBackend::Postgres { db_url, pool_max } => {
            tracing::info!("Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(*pool_max)
                .connect(db_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            tracing::info!("Successfully connected to database");

            schema::create_schema(&pool).await?;
            Ok(Arc::new(PgReadingStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory reading store; readings are lost on restart");
            Ok(Arc::new(MemoryReadingStore::new()))
        }
    }
}

/// Resolve when Ctrl-C is received.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, else the `AXUM_LOG_LEVEL` env var
///
/// Called once at startup, before any other logging.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,tower_http=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
