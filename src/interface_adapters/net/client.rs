use crate::interface_adapters::protocol::{ClientMessage, NewPlayerPayload, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rng::next_conn_id;
use crate::use_cases::types::{Outbound, Recipients, RoomEvent};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    InputClosed,
    UpdatesClosed,
    JoinRequired,
    JoinTimeout,
    ClosedBeforeJoin,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const JOIN_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// One serialized update plus its fan-out policy. Serialization happens once
/// in the shared serializer; every connection loop only filters and sends.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub recipients: Recipients,
    pub bytes: Utf8Bytes,
}

/// Serializes each committed update once and rebroadcasts the shared bytes.
/// Keeping a single serializer preserves the room task's commit order for
/// every subscriber.
pub async fn update_serializer(
    mut updates_rx: broadcast::Receiver<Outbound>,
    envelope_tx: broadcast::Sender<Envelope>,
) {
    loop {
        match updates_rx.recv().await {
            Ok(outbound) => {
                let msg = ServerMessage::from(outbound.update);
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize room update");
                        continue;
                    }
                };
                let _ = envelope_tx.send(Envelope {
                    recipients: outbound.recipients,
                    bytes: Utf8Bytes::from(txt),
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "update serializer lagged; events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("room updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Connection id doubles as the player id once the join handshake lands.
    let conn_id = next_conn_id();
    let span = info_span!("conn", conn_id);
    handle_socket_inner(socket, conn_id, state).instrument(span).await
}

async fn handle_socket_inner(mut socket: WebSocket, conn_id: u64, state: Arc<AppState>) {
    let mut ctx = match bootstrap_connection(&mut socket, conn_id, &state).await {
        Ok(ctx) => ctx,
        Err(NetError::ClosedBeforeJoin) => {
            // Nothing was registered for this connection, nothing to clean up.
            info!("client disconnected before join handshake");
            return;
        }
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            return;
        }
    };

    info!(display_name = %ctx.display_name, "client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
}

struct ConnCtx {
    pub conn_id: u64,
    pub display_name: String,
    pub input_tx: mpsc::Sender<RoomEvent>,
    pub envelope_rx: broadcast::Receiver<Envelope>,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_invalid_log: Instant,
    pub last_lag_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    conn_id: u64,
    state: &AppState,
) -> Result<ConnCtx, NetError> {
    // Subscribe *before* joining so the targeted join replies (own record,
    // roster, pickup list) cannot be missed.
    let envelope_rx = state.envelope_tx.subscribe();

    // The first meaningful client message must be the newPlayer handshake.
    let payload = match timeout(JOIN_HANDSHAKE_TIMEOUT, read_join_handshake(socket)).await {
        Ok(result) => result?,
        Err(_) => {
            let _ = send_close_with_reason(socket, close_code::POLICY, "join timeout").await;
            return Err(NetError::JoinTimeout);
        }
    };
    let display_name = payload.name.clone();

    // Tell the room task to create the player. Everything the client needs
    // next arrives through the envelope stream.
    state
        .input_tx
        .send(RoomEvent::Join {
            conn_id,
            name: payload.name,
            avatar: payload.avatar,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        conn_id,
        display_name,
        input_tx: state.input_tx.clone(),
        envelope_rx,

        msgs_in: 1,
        msgs_out: 0,
        invalid_json: 0,

        last_input_full_log: now,
        last_invalid_log: now,
        last_lag_log: now,

        close_frame: None,
    })
}

async fn send_close_with_reason(
    socket: &mut WebSocket,
    code: u16,
    reason: &'static str,
) -> Result<(), NetError> {
    socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.into(),
        })))
        .await
        .map_err(NetError::Ws)?;
    socket.close().await.map_err(NetError::Ws)
}

async fn read_join_handshake(socket: &mut WebSocket) -> Result<NewPlayerPayload, NetError> {
    loop {
        let Some(incoming) = socket.recv().await else {
            return Err(NetError::ClosedBeforeJoin);
        };

        let message = incoming.map_err(NetError::Ws)?;
        match message {
            Message::Text(text) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::NewPlayer(payload)) => Ok(payload),
                    Ok(_) => {
                        let _ = send_close_with_reason(socket, close_code::POLICY, "join required")
                            .await;
                        Err(NetError::JoinRequired)
                    }
                    Err(_) => {
                        let _ = send_close_with_reason(
                            socket,
                            close_code::POLICY,
                            "invalid join payload",
                        )
                        .await;
                        Err(NetError::JoinRequired)
                    }
                };
            }
            Message::Binary(_) => {
                let _ = send_close_with_reason(
                    socket,
                    close_code::UNSUPPORTED,
                    "binary messages not supported",
                )
                .await;
                return Err(NetError::JoinRequired);
            }
            Message::Ping(_) | Message::Pong(_) => {}
            Message::Close(_) => return Err(NetError::ClosedBeforeJoin),
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Forwards one validated event into the room task without blocking the
/// socket loop. A full channel drops the event; only a closed channel is
/// fatal.
fn forward_event(
    conn_id: u64,
    input_tx: &mpsc::Sender<RoomEvent>,
    event: RoomEvent,
    last_input_full_log: &mut Instant,
) -> Result<LoopControl, NetError> {
    match input_tx.try_send(event) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(last_input_full_log) {
                warn!(conn_id, "input channel full; dropping event");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

/// Parses a wire id (ids travel as strings for client compatibility).
fn parse_wire_id(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let conn_id = ctx.conn_id;

    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        input_tx,
        envelope_rx,
        msgs_in,
        msgs_out,
        invalid_json,
        last_input_full_log,
        last_invalid_log,
        last_lag_log,
        close_frame,
        ..
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming message from the client.
            incoming = socket.recv() => {
                match handle_incoming_ws(
                    incoming,
                    conn_id,
                    input_tx,
                    msgs_in,
                    invalid_json,
                    last_input_full_log,
                    last_invalid_log,
                    close_frame,
                ) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing update from the room task.
            envelope = envelope_rx.recv() => {
                match envelope {
                    Ok(env) => {
                        if env.recipients.includes(conn_id) {
                            match socket.send(Message::Text(env.bytes)).await {
                                Ok(()) => {
                                    *msgs_out += 1;
                                    false
                                }
                                Err(err) => {
                                    // Disconnect follows immediately.
                                    warn!(error = ?err, "failed to send update");
                                    true
                                }
                            }
                        } else {
                            false
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Delta protocol: missed events cannot be replayed, so
                        // a lagging client just sees stale peers until their
                        // next events arrive.
                        if should_log(last_lag_log) {
                            warn!(missed = n, "updates lagged; events dropped for this client");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::UpdatesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) =
        disconnect_cleanup(conn_id, input_tx, *msgs_in, *msgs_out, *invalid_json).await
    {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_incoming_ws(
    incoming: Option<Result<Message, axum::Error>>,
    conn_id: u64,
    input_tx: &mpsc::Sender<RoomEvent>,
    msgs_in: &mut u64,
    invalid_json: &mut u32,
    last_input_full_log: &mut Instant,
    last_invalid_log: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                *msgs_in += 1;

                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::NewPlayer(_)) => {
                        // The room's duplicate-session guard would reject this
                        // anyway; drop it here to keep the session stable.
                        if should_log(last_invalid_log) {
                            warn!(conn_id, "duplicate join ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Ok(ClientMessage::Move(direction)) => forward_event(
                        conn_id,
                        input_tx,
                        RoomEvent::Move {
                            conn_id,
                            direction: direction.into(),
                        },
                        last_input_full_log,
                    ),
                    Ok(ClientMessage::Attack(raw_target)) => match parse_wire_id(&raw_target) {
                        Some(target_id) => forward_event(
                            conn_id,
                            input_tx,
                            RoomEvent::Attack { conn_id, target_id },
                            last_input_full_log,
                        ),
                        None => Ok(drop_invalid(
                            conn_id,
                            "attack target",
                            invalid_json,
                            last_invalid_log,
                            close_frame,
                        )),
                    },
                    Ok(ClientMessage::PickupWeapon(raw_id)) => match parse_wire_id(&raw_id) {
                        Some(weapon_id) => forward_event(
                            conn_id,
                            input_tx,
                            RoomEvent::PickupWeapon { conn_id, weapon_id },
                            last_input_full_log,
                        ),
                        None => Ok(drop_invalid(
                            conn_id,
                            "pickup id",
                            invalid_json,
                            last_invalid_log,
                            close_frame,
                        )),
                    },
                    Ok(ClientMessage::ChatMessage(message)) => forward_event(
                        conn_id,
                        input_tx,
                        RoomEvent::Chat { conn_id, message },
                        last_input_full_log,
                    ),
                    Ok(ClientMessage::Emote(payload)) => {
                        if !payload.x.is_finite() || !payload.y.is_finite() {
                            return Ok(drop_invalid(
                                conn_id,
                                "emote position",
                                invalid_json,
                                last_invalid_log,
                                close_frame,
                            ));
                        }
                        forward_event(
                            conn_id,
                            input_tx,
                            RoomEvent::Emote {
                                conn_id,
                                emote: payload.emote,
                                x: payload.x,
                                y: payload.y,
                            },
                            last_input_full_log,
                        )
                    }
                    Err(parse_err) => {
                        *invalid_json += 1;
                        if should_log(last_invalid_log) {
                            warn!(
                                conn_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if *invalid_json > MAX_INVALID_JSON {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(conn_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(conn_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

/// Drops one well-formed but invalid event. Counts against the same budget
/// as malformed JSON, so a flood of bad ids also closes the connection.
fn drop_invalid(
    conn_id: u64,
    what: &'static str,
    invalid_json: &mut u32,
    last: &mut Instant,
    close_frame: &mut Option<CloseFrame>,
) -> LoopControl {
    *invalid_json += 1;
    if should_log(last) {
        warn!(conn_id, what, "invalid event payload dropped");
    }

    if *invalid_json > MAX_INVALID_JSON {
        *close_frame = Some(CloseFrame {
            code: close_code::POLICY,
            reason: "too many invalid messages".into(),
        });
        return LoopControl::Disconnect;
    }
    LoopControl::Continue
}

async fn disconnect_cleanup(
    conn_id: u64,
    input_tx: &mpsc::Sender<RoomEvent>,
    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,
) -> Result<(), NetError> {
    // The room removes the player and notifies everyone else.
    input_tx
        .send(RoomEvent::Leave { conn_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(conn_id, msgs_in, msgs_out, invalid_json, "connection stats");
    info!(conn_id, "client disconnected");
    Ok(())
}
