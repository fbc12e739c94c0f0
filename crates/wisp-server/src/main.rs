mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use wisp_api::admin::AdminGate;
use wisp_api::rate_limit::{Cooldowns, RateLimiter};
use wisp_api::reaper;
use wisp_api::state::{AppStateInner, Settings};
use wisp_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wisp=debug,wisp_api=debug,wisp_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env().inspect_err(|e| error!("Invalid configuration: {:#}", e))?;

    let db = Database::open(&config.db_path, config.lifetimes)?;

    let admin = AdminGate::new(config.admin_password.as_deref());
    if !admin.is_enabled() {
        warn!("No admin password configured; public rooms cannot be created or deleted");
    }

    let state = Arc::new(AppStateInner {
        db,
        limiter: RateLimiter::new(Cooldowns::default()),
        admin,
        settings: Settings {
            trust_forwarded_for: config.trust_forwarded_for,
            sweep_probability: config.sweep_probability,
        },
    });

    tokio::spawn(reaper::run_sweep_loop(state.clone(), config.sweep_interval_secs));

    let app = wisp_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Wisp listening on {}", addr);
    info!(
        "Lifetimes: poll grace {}s, sweep grace {}s, messages {}s; sweeping every {}s",
        config.lifetimes.poll_grace.as_secs(),
        config.lifetimes.sweep_grace.as_secs(),
        config.lifetimes.message_ttl.as_secs(),
        config.sweep_interval_secs
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
