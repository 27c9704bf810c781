//! The sveglia daemon: alarm scheduler, HTTP API, and keep-alive loop.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use sveglia_server::api::{self, SharedState};
use sveglia_server::clock::SystemClock;
use sveglia_server::config::ServerConfig;
use sveglia_server::notify::{AlertNotifier, Notifier, TermuxVibrator, default_chain};
use sveglia_server::registry::AlarmRegistry;
use sveglia_server::scheduler;
use sveglia_server::storage::JsonFileStore;
use sveglia_server::tracing::prelude::*;
use sveglia_server::wake::{self, StayAwake, TermuxWakeLock};

#[tokio::main]
async fn main() -> Result<()> {
    sveglia_server::tracing::init();
    let config = ServerConfig::from_env();
    info!("starting sveglia alarm server");

    let notifier: Arc<dyn Notifier> =
        Arc::new(AlertNotifier::new(default_chain(), Arc::new(TermuxVibrator)));
    let registry = AlarmRegistry::new(
        Box::new(JsonFileStore::new(&config.alarms_file)),
        Arc::new(SystemClock),
        notifier,
        config.ring_timeout,
    );

    let running = CancellationToken::new();

    let scheduler_task = tokio::spawn(scheduler::task(
        Arc::clone(&registry),
        config.poll_interval,
        running.clone(),
    ));

    let guard: Arc<dyn StayAwake> = Arc::new(TermuxWakeLock::new(&config.wake_marker));
    let keep_awake_task = tokio::spawn(wake::keep_awake_task(guard, running.clone()));

    let state = SharedState {
        registry: Arc::clone(&registry),
    };
    let mut server_task = tokio::spawn(api::serve(config.listen, state, running.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            running.cancel();
            match server_task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("API server failed: {e}"),
                Err(e) => error!("API server task failed: {e}"),
            }
        }
        result = &mut server_task => {
            running.cancel();
            match result {
                Ok(Ok(())) => info!("API server exited"),
                Ok(Err(e)) => error!("API server failed: {e}"),
                Err(e) => error!("API server task failed: {e}"),
            }
        }
    }

    // Graceful join: no tick or keep-alive beat left mid-flight.
    if let Err(e) = scheduler_task.await {
        error!("scheduler task failed: {e}");
    }
    if let Err(e) = keep_awake_task.await {
        error!("keep-alive task failed: {e}");
    }
    registry.stop_ringing().await;

    info!("sveglia stopped");
    Ok(())
}
