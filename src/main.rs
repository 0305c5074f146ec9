//! Storefront - catalog, cart, checkout and payment verification service

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::config::{Config, StoreBackend};
use storefront::notifications::{LogMailer, Mailer, NatsMailer, Notifier, RetryPolicy};
use storefront::store::{MemoryStore, PgStore, Store};
use storefront::{api, shutdown, AppState};

const NOTIFICATION_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("invalid configuration")?;

    let (store, pg): (Arc<dyn Store>, Option<PgStore>) = match config.store {
        StoreBackend::Postgres => {
            let url = config.database_url.as_deref().context("DATABASE_URL is required")?;
            let pg = PgStore::connect(url, config.database_max_connections).await.context("connecting to Postgres")?;
            (Arc::new(pg.clone()), Some(pg))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            (Arc::new(MemoryStore::new()), None)
        }
    };

    let mailer: Arc<dyn Mailer> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsMailer::new(client, config.mail_subject.clone())),
            Err(e) => {
                tracing::warn!("NATS unavailable ({e}), emails will only be logged");
                Arc::new(LogMailer)
            }
        },
        None => Arc::new(LogMailer),
    };
    let (notifier, notifications) = Notifier::spawn(
        mailer, config.notification_queue_capacity, &config.store_email, RetryPolicy::default(),
    );

    let (trigger, shutdown) = shutdown::channel();
    let port = config.port;
    let state = AppState::new(config, store, notifier, shutdown);
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("🚀 Storefront listening on 0.0.0.0:{port}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received");
            trigger.trigger();
        })
        .await?;

    // the router (and every Notifier clone in it) is gone; let queued mail go out
    if tokio::time::timeout(NOTIFICATION_DRAIN_TIMEOUT, notifications).await.is_err() {
        tracing::warn!("Notification queue not drained before timeout");
    }
    if let Some(pg) = pg {
        pg.close().await;
    }
    tracing::info!("Storefront stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => { signal.recv().await; }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
