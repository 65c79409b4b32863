//! Padel Slots Back binary entrypoint wiring REST, the reminder scheduler and storage.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padel_slots_back::{
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    routes,
    services::{
        notification::{LogSink, SharedSink, TELEGRAM_API_URL, TelegramSink},
        scheduler,
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    start_storage(&app_state).await?;

    let sink = build_sink()?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reminders = tokio::spawn(scheduler::run(app_state.clone(), sink, shutdown_rx));

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    let _ = shutdown_tx.send(true);
    reminders.await.context("joining reminder scheduler")?;
    Ok(())
}

/// Connect MongoDB through the supervisor when `MONGO_URI` is set, otherwise
/// fall back to the in-memory store.
#[cfg(feature = "mongo-store")]
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    use padel_slots_back::dao::{
        game_store::{
            GameStore,
            mongodb::{MongoConfig, MongoGameStore},
        },
        storage::StorageError,
    };
    use padel_slots_back::services::storage_supervisor;

    if env::var_os("MONGO_URI").is_none() {
        install_memory_store(state).await;
        return Ok(());
    }

    let config = MongoConfig::from_env()
        .await
        .context("reading MongoDB configuration")?;
    info!(database = %config.database_name, "using MongoDB storage");

    tokio::spawn(storage_supervisor::run(state.clone(), move || {
        let config = config.clone();
        async move {
            let store = MongoGameStore::connect(config)
                .await
                .map_err(StorageError::from)?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
        }
    }));
    Ok(())
}

#[cfg(not(feature = "mongo-store"))]
async fn start_storage(state: &SharedState) -> anyhow::Result<()> {
    install_memory_store(state).await;
    Ok(())
}

async fn install_memory_store(state: &SharedState) {
    warn!("MONGO_URI not set; games and reminders are kept in memory only");
    state
        .install_game_store(Arc::new(MemoryGameStore::new()))
        .await;
}

/// Telegram delivery when `BOT_TOKEN` is set, log-only delivery otherwise.
fn build_sink() -> anyhow::Result<SharedSink> {
    let Ok(token) = env::var("BOT_TOKEN") else {
        warn!("BOT_TOKEN not set; reminders are only logged");
        return Ok(Arc::new(LogSink));
    };

    let api_url = env::var("TELEGRAM_API_URL").unwrap_or_else(|_| TELEGRAM_API_URL.into());
    let http = reqwest::Client::builder()
        .build()
        .context("building HTTP client")?;
    Ok(Arc::new(TelegramSink::new(http, &api_url, &token)))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
