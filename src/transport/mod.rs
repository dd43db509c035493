//! Message Transport (spec §4.5): the WebSocket boundary between a remote
//! coordinator/participant and the Session Manager. Built on axum's `ws`
//! feature exactly as the teacher's `routes/ws.rs` upgrades connections and
//! splits the socket into a reader/writer pair, but adds auth-first
//! discipline, framing limits, per-connection rate limiting, and a
//! ping/pong heartbeat that the teacher's pure-relay sockets didn't need.

pub mod messages;

pub use messages::*;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use governor::{Quota, RateLimiter};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::manager::SessionManager;
use crate::model::{ParticipantId, SessionId, SignaturePayload};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/ws", get(ws_handler))
}

async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let max_size = state.config.ws_max_frame_bytes;
    ws.max_message_size(max_size)
        .on_upgrade(move |socket| handle_connection(socket, state))
}

/// A connection is `unauthenticated` until its first valid `AUTH` frame,
/// then pinned to exactly the session/role/participant it authenticated as
/// (spec §4.5, "the first message on every connection must be `AUTH`").
enum ConnState {
    Unauthenticated,
    Coordinator { session_id: SessionId },
    Participant { session_id: SessionId, participant_id: ParticipantId },
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    metrics::counter!("ws_connections_total").increment(1);

    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(state.config.ws_outbound_queue_depth);

    let limiter = RateLimiter::direct(
        Quota::per_second(NonZeroU32::new(state.config.ws_rate_limit_per_sec).unwrap_or(nonzero(20)))
            .allow_burst(NonZeroU32::new(state.config.ws_rate_limit_burst).unwrap_or(nonzero(40))),
    );

    let mut heartbeat = tokio::time::interval(Duration::from_secs(state.config.ws_heartbeat_interval_secs));
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut missed_pongs: u32 = 0;

    let mut conn = ConnState::Unauthenticated;

    // Forward outbound server messages to the socket write half on its own
    // task so a slow reader never blocks the reader loop below.
    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&msg) else { continue };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sender
            .send(Message::Close(Some(CloseFrame {
                code: 1000,
                reason: "closing".into(),
            })))
            .await;
    });

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                missed_pongs += 1;
                if missed_pongs > 2 {
                    tracing::debug!("heartbeat: closing connection after missed pongs");
                    break;
                }
                if out_tx.send(ServerMessage::Pong).await.is_err() {
                    break;
                }
            }
            frame = receiver.next() => {
                let Some(frame) = frame else { break };
                match frame {
                    Ok(Message::Close(_)) => break,
                    Ok(Message::Pong(_)) => { missed_pongs = 0; }
                    Ok(Message::Ping(_)) => {}
                    Ok(Message::Text(text)) => {
                        if limiter.check().is_err() {
                            let _ = out_tx.send(ServerMessage::Error {
                                message: "rate exceeded".into(),
                                code: "rate-exceeded".into(),
                            }).await;
                            break;
                        }
                        if !handle_text_frame(&text, &mut conn, &state.manager, &state.config.public_base_url, &out_tx).await {
                            break;
                        }
                    }
                    Ok(Message::Binary(_)) => {
                        let _ = out_tx.send(ServerMessage::Error {
                            message: "binary frames are not accepted".into(),
                            code: "malformed-frame".into(),
                        }).await;
                        break;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    writer.abort();
    disconnect(&conn, &state.manager).await;
    metrics::counter!("ws_disconnections_total").increment(1);
}

fn nonzero(v: u32) -> NonZeroU32 {
    NonZeroU32::new(v).unwrap_or(NonZeroU32::new(1).unwrap())
}

async fn disconnect(conn: &ConnState, manager: &SessionManager) {
    if let ConnState::Participant { session_id, participant_id } = conn {
        manager.disconnect(*session_id, *participant_id).await;
    }
}

/// Returns `false` when the connection should be closed.
async fn handle_text_frame(
    text: &str,
    conn: &mut ConnState,
    manager: &SessionManager,
    public_base_url: &str,
    out_tx: &mpsc::Sender<ServerMessage>,
) -> bool {
    let parsed: Result<ClientMessage, _> = serde_json::from_str(text);
    let message = match parsed {
        Ok(m) => m,
        Err(_) => {
            let _ = out_tx
                .send(ServerMessage::Error { message: "malformed frame".into(), code: "malformed-frame".into() })
                .await;
            return false;
        }
    };

    match (&conn, message) {
        (ConnState::Unauthenticated, ClientMessage::Auth(payload)) => {
            let Some(session_id) = SessionId::parse(&payload.session_id) else {
                let _ = out_tx.send(ServerMessage::AuthFailed { message: "unknown session".into() }).await;
                return false;
            };
            match manager
                .authenticate(session_id, payload.pin, payload.role, payload.label, out_tx.clone())
                .await
            {
                Ok(reply) => {
                    let participant_id = match reply.outcome {
                        crate::manager::AuthOutcome::Coordinator => {
                            *conn = ConnState::Coordinator { session_id };
                            ParticipantId(0)
                        }
                        crate::manager::AuthOutcome::Participant(id) => {
                            *conn = ConnState::Participant { session_id, participant_id: id };
                            id
                        }
                    };
                    let _ = out_tx
                        .send(ServerMessage::AuthSuccess { participant_id, session_info: reply.session_info })
                        .await;
                    true
                }
                Err(e) => {
                    let _ = out_tx.send(ServerMessage::AuthFailed { message: e.to_string() }).await;
                    false
                }
            }
        }
        (ConnState::Unauthenticated, ClientMessage::CreateSession(payload)) => {
            let config = crate::model::SessionConfig {
                threshold: payload.threshold,
                eligible_public_keys: payload.eligible_public_keys,
                expected_participants: payload.expected_participants,
                timeout_ms: payload.timeout_ms.unwrap_or_else(|| manager.default_timeout_ms()),
                pin: payload.pin,
                contract_interface: payload.contract_interface,
            };
            match manager.create_session(config) {
                Ok((session_id, pin)) => {
                    *conn = ConnState::Coordinator { session_id };
                    // Register this connection as the session's coordinator
                    // subscriber so it receives broadcasts (TRANSACTION_RECEIVED,
                    // THRESHOLD_MET, ...) the same way a reconnecting coordinator
                    // would after an explicit AUTH.
                    let _ = manager
                        .authenticate(session_id, pin.clone(), crate::transport::Role::Coordinator, None, out_tx.clone())
                        .await;
                    let connection_string = crate::connstr::encode(public_base_url, session_id, Some(&pin));
                    let _ = out_tx
                        .send(ServerMessage::SessionCreated { session_id: session_id.to_string(), pin, connection_string })
                        .await;
                    true
                }
                Err(e) => {
                    let _ = out_tx
                        .send(ServerMessage::Error { message: e.to_string(), code: e.code().to_string() })
                        .await;
                    false
                }
            }
        }
        (ConnState::Unauthenticated, _) => {
            let _ = out_tx
                .send(ServerMessage::Error { message: "unauthenticated".into(), code: "unauthenticated".into() })
                .await;
            false
        }
        (ConnState::Coordinator { session_id }, ClientMessage::InjectTransaction(payload)) => {
            let Ok(frozen) = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &payload.frozen_transaction_base64) else {
                let _ = out_tx.send(ServerMessage::Error { message: "malformed frozen transaction".into(), code: "decode-error".into() }).await;
                return true;
            };
            match manager.inject_transaction(*session_id, frozen, payload.metadata).await {
                Ok(decoded) => {
                    let _ = out_tx
                        .send(ServerMessage::TransactionInjected { checksum: decoded.checksum.clone(), decoded })
                        .await;
                }
                Err(e) => {
                    let _ = out_tx.send(ServerMessage::Error { message: e.to_string(), code: e.code().to_string() }).await;
                }
            }
            true
        }
        (ConnState::Coordinator { session_id }, ClientMessage::CancelSession(payload)) => {
            let _ = manager.cancel(*session_id, payload.reason).await;
            true
        }
        (ConnState::Participant { session_id, participant_id }, ClientMessage::ParticipantReady(payload)) => {
            if let Err(e) = manager.participant_ready(*session_id, *participant_id, payload.public_key).await {
                let _ = out_tx.send(ServerMessage::Error { message: e.to_string(), code: e.code().to_string() }).await;
            }
            true
        }
        (ConnState::Participant { session_id, participant_id }, ClientMessage::SignatureSubmit(payload)) => {
            let signature = match payload.signature {
                crate::transport::messages::SignaturePayloadWire::Single(s) => SignaturePayload::Single(s),
                crate::transport::messages::SignaturePayloadWire::Multi(v) => SignaturePayload::Multi(v),
            };
            let _ = manager
                .signature_submit(*session_id, *participant_id, payload.public_key, signature)
                .await;
            true
        }
        (ConnState::Participant { session_id, participant_id }, ClientMessage::TransactionRejected(payload)) => {
            let _ = manager.participant_reject(*session_id, *participant_id, payload.reason).await;
            false
        }
        (_, ClientMessage::Ping) => {
            let _ = out_tx.send(ServerMessage::Pong).await;
            true
        }
        _ => {
            let _ = out_tx
                .send(ServerMessage::Error { message: "message not valid for this role".into(), code: "role-mismatch".into() })
                .await;
            true
        }
    }
}

