//! JobMate authentication API server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use jobmate_core::notify::{LogNotifier, Notifier, SmtpNotifier};
use jobmate_core::store::{IdentityStore, MemoryStore, OtpStore, PgStore};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "jobmate_api_server", about = "JobMate authentication API server")]
struct Args {
    /// Port to listen on. Overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/jobmate"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Keep all state in memory instead of PostgreSQL. Development only.
    #[arg(long, default_value_t = false)]
    memory_store: bool,

    /// Seconds between sweeps of expired verification codes.
    #[arg(long, env = "OTP_CLEANUP_INTERVAL_SECS", default_value_t = 3600)]
    otp_cleanup_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,jobmate_api=debug,jobmate_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let mut config = jobmate_api::config::ApiConfig::from_env();
    config.pg_connection_url = args.database_url.clone();
    if let Some(port) = args.port {
        let host = config
            .bind_addr
            .rsplit_once(':')
            .map_or("127.0.0.1", |(host, _)| host)
            .to_string();
        config.bind_addr = format!("{host}:{port}");
    }
    if !config.cookie_secure {
        warn!("COOKIE_SECURE is off; auth cookies will be sent over plain HTTP");
    }

    info!(bind_addr = %config.bind_addr, memory_store = args.memory_store, "starting jobmate_api_server");

    let (identities, otps): (Arc<dyn IdentityStore>, Arc<dyn OtpStore>) = if args.memory_store {
        warn!("using in-memory store; all accounts are lost on exit");
        let store = Arc::new(MemoryStore::new());
        (store.clone() as Arc<dyn IdentityStore>, store as Arc<dyn OtpStore>)
    } else {
        info!(max_connections = args.max_connections, "configuring connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&args.database_url)
            .await?;

        info!("running database migrations");
        jobmate_api::migrate(&pool).await?;

        let store = Arc::new(PgStore::new(pool));
        (store.clone() as Arc<dyn IdentityStore>, store as Arc<dyn OtpStore>)
    };

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpNotifier::new(smtp.clone())?),
        None => {
            warn!("SMTP_HOST is not set; verification codes will only be logged at debug level");
            Arc::new(LogNotifier::new())
        }
    };

    let state = jobmate_api::AppState::new(config.clone(), identities, otps, notifier)?;

    let otp_cleanup = state
        .otp
        .spawn_cleanup_task(Duration::from_secs(args.otp_cleanup_interval_secs.max(1)));
    let state_cleanup = state.oauth_states.spawn_cleanup_task();

    let app = jobmate_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            info!("shutdown requested");
            shutdown.cancel();
        }
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    otp_cleanup.abort();
    state_cleanup.abort();

    result?;
    info!("server stopped");
    Ok(())
}
