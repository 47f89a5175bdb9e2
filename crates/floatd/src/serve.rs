// SPDX-FileCopyrightText: 2026 Floatd Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process wiring: builds the cache, game-data refresher, bot fleet,
//! scheduler, and HTTP gateway, then serves until a shutdown signal.
//!
//! [`build`] assembles everything short of binding the listener so
//! embedders and the end-to-end suite can drive the stack directly;
//! [`run`] adds signal handling, the listener, and ordered shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use floatd_bot::{BotController, spawn_bot};
use floatd_cache::ResultCache;
use floatd_config::FloatdConfig;
use floatd_core::error::FloatdError;
use floatd_core::traits::gc::GcDriverFactory;
use floatd_gamedata::GameData;
use floatd_gateway::{GatewayConfig, GatewayState};
use floatd_queue::{FleetHealth, Scheduler};

/// How long shutdown waits for the fleet to log off.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// The assembled service, short of a bound listener.
pub struct App {
    pub state: GatewayState,
    pub cancel: CancellationToken,
}

/// Wires every subsystem: result cache (+ sweep timer), game-data
/// refresher, one bot per configured login (proxies round-robin), the
/// fleet controller, and the started scheduler.
pub fn build(
    config: &FloatdConfig,
    factory: Arc<dyn GcDriverFactory>,
    cancel: CancellationToken,
) -> Result<App, FloatdError> {
    let cache = Arc::new(ResultCache::new(
        config.cache.max_entries,
        Duration::from_secs(config.cache.ttl_secs),
    ));
    spawn_cache_sweeper(
        cache.clone(),
        Duration::from_secs(config.cache.cleanup_interval_secs),
        cancel.clone(),
    );

    let game_data = Arc::new(GameData::new(&config.game_data)?);
    if config.game_data.enabled {
        let interval = Duration::from_secs(config.game_data.update_interval_secs);
        tokio::spawn(
            game_data
                .clone()
                .run_refresh_loop(interval, cancel.clone()),
        );
        info!(
            interval_secs = config.game_data.update_interval_secs,
            "game data refresher started"
        );
    } else {
        info!("game data updates disabled by configuration");
    }

    let mut controller = BotController::new();
    for (i, login) in config.logins.iter().enumerate() {
        let proxy = config.proxy_for(i).map(str::to_string);
        controller.add_bot(spawn_bot(
            login.clone(),
            proxy,
            &config.bot_settings,
            factory.clone(),
            cache.clone(),
            game_data.clone(),
            cancel.clone(),
        ));
    }
    let controller = Arc::new(controller);
    info!(bots = controller.bot_count(), "fleet spawned");

    let scheduler = Scheduler::new(controller.clone());
    scheduler.start(
        controller.clone() as Arc<dyn FleetHealth>,
        cancel.clone(),
    );

    let state = GatewayState::new(
        controller,
        scheduler,
        cache,
        GatewayConfig::from_config(config)?,
    );
    Ok(App { state, cancel })
}

/// Runs the full service until SIGINT/SIGTERM, then shuts down in
/// order: listener, queued entries, fleet.
pub async fn run(
    config: FloatdConfig,
    factory: Arc<dyn GcDriverFactory>,
) -> Result<(), FloatdError> {
    let cancel = install_signal_handler();
    let app = build(&config, factory, cancel.clone())?;

    let result = floatd_gateway::serve(
        &config.http.host,
        config.http.port,
        app.state.clone(),
        cancel.clone(),
    )
    .await;

    // The listener is down; reject queued work and drain the fleet.
    cancel.cancel();
    app.state.scheduler.drain_shutdown();
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;
    while app.state.controller.ready_count() > 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    if app.state.controller.ready_count() > 0 {
        warn!("shutdown grace elapsed with bots still online");
    } else {
        info!("shutdown complete");
    }
    result
}

/// Installs handlers for SIGTERM and SIGINT (Ctrl+C).
///
/// Returns a token cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm =
                signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            tokio::select! {
                _ = ctrl_c => {
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

fn spawn_cache_sweeper(cache: Arc<ResultCache>, interval: Duration, cancel: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // Skip the immediate first tick; a fresh cache has nothing to sweep.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => cache.cleanup_expired(),
                _ = cancel.cancelled() => {
                    debug!("cache sweeper shutting down");
                    break;
                }
            }
        }
    });
}

/// Initializes the tracing subscriber with the configured log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("floatd={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
