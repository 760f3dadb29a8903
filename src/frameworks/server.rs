// Framework bootstrap for the room server runtime.

use crate::domain::WorldTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{Envelope, update_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::room::room_task;
use crate::use_cases::types::{Outbound, RoomEvent};

use axum::{Router, routing::get};
use std::io::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state() -> Arc<AppState> {
    // input: every socket event and timer funnels into the single room task.
    let (input_tx, input_rx) = mpsc::channel::<RoomEvent>(config::INPUT_CHANNEL_CAPACITY);

    // updates: committed outcomes leave the room task in commit order.
    let (updates_tx, _updates_rx) =
        broadcast::channel::<Outbound>(config::UPDATE_BROADCAST_CAPACITY);

    // envelopes: serialized once, fanned out to every connection loop.
    let (envelope_tx, _envelope_rx) =
        broadcast::channel::<Envelope>(config::UPDATE_BROADCAST_CAPACITY);

    // Spawn the authoritative room loop.
    tokio::spawn(room_task(
        input_rx,
        input_tx.clone(),
        updates_tx.clone(),
        WorldTuning::default(),
    ));

    // Spawn the shared update serializer in the adapter layer.
    tokio::spawn(update_serializer(updates_tx.subscribe(), envelope_tx.clone()));

    Arc::new(AppState {
        input_tx,
        updates_tx,
        envelope_tx,
    })
}
