use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

/// Backoff and polling periods of the supervisor loop.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorTiming {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub health_poll_interval: Duration,
    pub max_reconnect_attempts: u32,
}

impl Default for SupervisorTiming {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_secs(10),
            health_poll_interval: Duration::from_secs(5),
            max_reconnect_attempts: 3,
        }
    }
}

/// Connect to the storage backend and keep the shared state degraded while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    run_with(state, connect, SupervisorTiming::default()).await
}

/// [`run`] with explicit timing.
pub async fn run_with<F, Fut>(state: SharedState, mut connect: F, timing: SupervisorTiming)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = timing.initial_delay;

    loop {
        match connect().await {
            Ok(store) => {
                state.install_game_store(store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = timing.initial_delay;

                supervise(&state, store, timing).await;
                warn!("exhausted storage reconnect attempts; connecting from scratch");
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
            }
        }

        sleep(delay).await;
        delay = (delay * 2).min(timing.max_delay);
    }
}

/// Poll `store` until it fails and cannot be reconnected.
async fn supervise(state: &SharedState, store: Arc<dyn GameStore>, timing: SupervisorTiming) {
    loop {
        sleep(timing.health_poll_interval).await;

        let Err(err) = store.health_check().await else {
            continue;
        };
        warn!(error = %err, "storage health check failed; entering degraded mode");
        state.clear_game_store().await;

        let mut reconnect_delay = timing.initial_delay;
        let mut reconnected = false;
        for attempt in 0..timing.max_reconnect_attempts {
            match store.try_reconnect().await {
                Ok(()) => {
                    info!(attempt, "storage reconnection succeeded; leaving degraded mode");
                    reconnected = true;
                    break;
                }
                Err(reconnect_err) => {
                    warn!(attempt, error = %reconnect_err, "storage reconnect attempt failed");
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(timing.max_delay);
                }
            }
        }

        if !reconnected {
            return;
        }
        state.install_game_store(store.clone()).await;
    }
}
