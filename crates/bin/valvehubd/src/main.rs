//! # valvehubd — valvehub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Open the configured valve driver and drive the initial valve state
//! - Construct application services, injecting adapters via port traits
//! - Build the axum router and serve it
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use valvehub_adapter_http_axum::server;
use valvehub_adapter_http_axum::state::AppState;
use valvehub_adapter_storage_sqlite_sqlx::Config as StorageConfig;
use valvehub_adapter_virtual::VirtualValveDriver;
use valvehub_app::dispatcher::CommandDispatcher;
use valvehub_app::event_bus::InProcessEventBus;
use valvehub_app::event_recorder::EventRecorder;
use valvehub_app::ports::ValveDriver;
use valvehub_app::services::valve_service::ValveService;
use valvehub_domain::valve::ValveBank;

use crate::config::{Config, DriverConfig, DriverKind};

/// How long open connections get to finish once shutdown begins.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the recorder to persist the final events.
const RECORDER_DRAIN: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let event_store = Arc::new(db.event_store());

    // Event bus + recorder
    let event_bus = Arc::new(InProcessEventBus::new(config.bus.capacity));
    let recorder = EventRecorder::new(Arc::clone(&event_store)).spawn(event_bus.subscribe());

    // Valves
    let bank = config.valve_bank()?;
    let driver = open_driver(&config.driver, &bank)?;
    let valves = Arc::new(ValveService::new(bank, driver, Arc::clone(&event_bus)));
    valves
        .initialize()
        .await
        .context("failed to drive initial valve state")?;

    let dispatcher = Arc::new(CommandDispatcher::new(valves, config.dispatch_limits()));

    // HTTP
    let state = AppState::new(dispatcher, event_store, Arc::clone(&event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "valvehubd listening");

    server::serve(
        listener,
        state,
        config.server.ui_dir.clone(),
        shutdown_signal(),
        DRAIN_TIMEOUT,
    )
    .await
    .context("server error")?;

    drop(event_bus);
    if tokio::time::timeout(RECORDER_DRAIN, recorder).await.is_err() {
        tracing::warn!("event recorder did not drain before exit");
    }
    tracing::info!("valvehubd stopped");

    Ok(())
}

fn open_driver(config: &DriverConfig, bank: &ValveBank) -> anyhow::Result<Box<dyn ValveDriver>> {
    match config.kind {
        DriverKind::Virtual => {
            tracing::warn!("using the virtual valve driver, no relays will switch");
            Ok(Box::new(VirtualValveDriver::new()))
        }
        DriverKind::ShiftRegister => {
            let driver = config
                .shift_register
                .open()
                .context("failed to open shift register")?;
            let channels: Vec<u8> = bank.valves().iter().map(|valve| valve.channel).collect();
            driver
                .check_channels(&channels)
                .context("valve layout does not fit the register chain")?;
            Ok(Box::new(driver))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
