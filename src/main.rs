//! flixcache - local caching sidecar
//!
//! Fronts the remote movie API for the UI: intercepts every request, serves
//! cached copies when the network is gone and exposes the in-memory caches
//! under `/_flix`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use flixcache::auth::SessionStore;
use flixcache::clock::SystemClock;
use flixcache::proxy::{HttpFetcher, InterceptionAgent, Notification};
use flixcache::{
    create_router, spawn_auth_watcher, spawn_cleanup_task, AppState, Config, ResponseStores,
};

const NOTIFICATION_BUFFER: usize = 32;

/// Main entry point for the flixcache sidecar.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the persistent stores and the stored credential
/// 4. Install and activate the interception agent
/// 5. Start the stale sweeper and auth watcher
/// 6. Serve the router until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to info, overridable with RUST_LOG
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flixcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting flixcache sidecar");

    let config = Config::from_env();
    info!(
        "Configuration loaded: app_origin={}, upstream={}, port={}, store={}, version={}",
        config.app_origin,
        config.upstream_url,
        config.server_port,
        config.store_path,
        config.cache_version
    );

    let stores = ResponseStores::from_config(&config).context("failed to open response stores")?;
    let app_origin = Url::parse(&config.app_origin).context("APP_ORIGIN is not a valid URL")?;
    let upstream = Url::parse(&config.upstream_url).context("UPSTREAM_URL is not a valid URL")?;
    let fetcher = HttpFetcher::new(app_origin, upstream, config.request_timeout())
        .context("failed to build HTTP client")?;

    let session = Arc::new(SessionStore::new(config.session_path.clone()));
    match session.load() {
        Ok(true) => info!("Stored credential found"),
        Ok(false) => info!("No stored credential"),
        Err(e) => warn!(error = %e, "Ignoring unreadable session file"),
    }

    let (notify_tx, notify_rx) = mpsc::channel(NOTIFICATION_BUFFER);
    let agent = InterceptionAgent::new(stores, Arc::new(fetcher), &config)
        .context("failed to create interception agent")?
        .with_notifications(notify_tx);
    let agent = Arc::new(agent);

    let report = agent.install().await;
    info!(
        cached = report.cached.len(),
        failed = report.failed.len(),
        "Install finished"
    );
    let removed = agent.activate().context("failed to activate interception agent")?;
    info!(removed = ?removed, "Interception agent activated");

    let state = AppState::with_agent(&config, agent, session, Arc::new(SystemClock));

    let tasks = vec![
        spawn_cleanup_task(
            state.manager.clone(),
            Duration::from_secs(config.cleanup_interval),
        ),
        spawn_auth_watcher(state.auth_tx.subscribe(), state.coordinator.clone()),
        spawn_notification_logger(notify_rx),
    ];
    info!("Background tasks started");

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tasks))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Logs push notifications; there is no display surface in the sidecar.
fn spawn_notification_logger(mut rx: mpsc::Receiver<Notification>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(notification) = rx.recv().await {
            info!(
                title = %notification.title,
                body = %notification.body,
                "Notification received"
            );
        }
    })
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then aborts the
/// background tasks.
async fn shutdown_signal(tasks: Vec<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    for task in tasks {
        task.abort();
    }
    warn!("Background tasks aborted");
}
