//! Background task driving a single gateway connection.
//!
//! One call to [`run`] covers exactly one connection lifetime: connect,
//! handshake, pump frames, emit `Closed` once, terminate. Reconnect
//! policy belongs to the caller, which replaces the whole handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::{ClientCommand, ClientConfig};
use crate::creds::AuthState;
use crate::error::ClientError;
use crate::protocol::{ClientEvent, ClientFrame, DisconnectReason, ServerFrame};

// ---------------------------------------------------------------------------
// Ref Counter
// ---------------------------------------------------------------------------

/// Monotonically increasing ref counter for outbound frames.
static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Sends awaiting a gateway ack, keyed by frame ref.
pub(crate) type PendingAcks =
    Arc<Mutex<HashMap<String, oneshot::Sender<Result<(), ClientError>>>>>;

// ---------------------------------------------------------------------------
// Connection Task
// ---------------------------------------------------------------------------

pub(crate) async fn run(
    config: ClientConfig,
    auth: AuthState,
    event_tx: mpsc::Sender<ClientEvent>,
    command_rx: mpsc::Receiver<ClientCommand>,
) {
    let url = config.gateway_url.clone();
    info!(url = %url, "Connecting to chat gateway");

    let ws_stream = match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        tokio_tungstenite::connect_async(&url),
    )
    .await
    {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            error!(error = %e, "Failed to connect to chat gateway");
            emit_closed(&event_tx, DisconnectReason::ConnectionLost).await;
            return;
        }
        Err(_elapsed) => {
            error!(
                timeout_secs = config.connect_timeout_secs,
                "Gateway connection timed out"
            );
            emit_closed(&event_tx, DisconnectReason::ConnectionLost).await;
            return;
        }
    };

    let (ws_write, mut ws_read) = ws_stream.split();
    let ws_write = Arc::new(Mutex::new(ws_write));

    // Handshake: identify the device and replay stored credentials. An
    // empty credential state tells the gateway to start pairing, which
    // comes back to us as a Qr frame.
    let hello = ClientFrame::Hello {
        device_id: Uuid::new_v4().to_string(),
        device_name: config.device_name.clone(),
        creds: auth.get("creds").cloned(),
    };
    match serde_json::to_string(&hello) {
        Ok(json) => {
            let mut writer = ws_write.lock().await;
            if writer.send(WsMessage::Text(json.into())).await.is_err() {
                warn!("Handshake write failed");
                emit_closed(&event_tx, DisconnectReason::ConnectionLost).await;
                return;
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to serialize handshake");
            emit_closed(&event_tx, DisconnectReason::ConnectionLost).await;
            return;
        }
    }

    let pending: PendingAcks = Arc::new(Mutex::new(HashMap::new()));

    // Spawn heartbeat task.
    let heartbeat_handle = tokio::spawn(heartbeat_task(
        Arc::clone(&ws_write),
        config.heartbeat_interval_secs,
    ));

    // Spawn command forwarder.
    let cmd_handle = tokio::spawn(command_forwarder(
        command_rx,
        Arc::clone(&ws_write),
        Arc::clone(&pending),
    ));

    // Process incoming frames.
    let mut reason = DisconnectReason::ConnectionLost;
    while let Some(msg_result) = ws_read.next().await {
        match msg_result {
            Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    if let Some(close_reason) =
                        handle_server_frame(frame, &pending, &event_tx).await
                    {
                        reason = close_reason;
                        break;
                    }
                }
                Err(_) => {
                    debug!(text = %text, "Unrecognized frame from gateway");
                }
            },
            Ok(WsMessage::Close(_)) => {
                info!("Gateway closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "WebSocket error");
                break;
            }
            _ => {}
        }
    }

    // Cleanup.
    heartbeat_handle.abort();
    cmd_handle.abort();
    fail_pending(&pending).await;
    emit_closed(&event_tx, reason).await;
}

async fn emit_closed(event_tx: &mpsc::Sender<ClientEvent>, reason: DisconnectReason) {
    let _ = event_tx.send(ClientEvent::Closed { reason }).await;
}

/// Fail every send still waiting for an ack when the connection ends.
async fn fail_pending(pending: &PendingAcks) {
    for (_, ack) in pending.lock().await.drain() {
        let _ = ack.send(Err(ClientError::NotConnected));
    }
}

// ---------------------------------------------------------------------------
// Frame Handler
// ---------------------------------------------------------------------------

/// Handle a single frame from the gateway. Returns the disconnect reason
/// when the frame closes the session.
pub(crate) async fn handle_server_frame(
    frame: ServerFrame,
    pending: &PendingAcks,
    event_tx: &mpsc::Sender<ClientEvent>,
) -> Option<DisconnectReason> {
    match frame {
        ServerFrame::Qr { code } => {
            info!("Pairing challenge received");
            let _ = event_tx.send(ClientEvent::QrIssued(code)).await;
            None
        }
        ServerFrame::CredsUpdate { files } => {
            debug!(files = files.len(), "Credential update received");
            let _ = event_tx.send(ClientEvent::CredentialsUpdated(files)).await;
            None
        }
        ServerFrame::Open => {
            info!("Session open");
            let _ = event_tx.send(ClientEvent::Opened).await;
            None
        }
        ServerFrame::Close { reason } => {
            info!(reason = ?reason, "Gateway closing session");
            Some(reason)
        }
        ServerFrame::Ack {
            msg_ref,
            status,
            message,
        } => {
            if let Some(ack) = pending.lock().await.remove(&msg_ref) {
                let result = if status == "ok" {
                    Ok(())
                } else {
                    Err(ClientError::Rejected(
                        message.unwrap_or_else(|| "unknown error".to_string()),
                    ))
                };
                let _ = ack.send(result);
            } else {
                // Heartbeat acks land here; nothing is waiting on them.
                debug!(msg_ref = %msg_ref, "Ack without a pending send");
            }
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------------

async fn heartbeat_task<S>(ws_write: Arc<Mutex<S>>, interval_secs: u64)
where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    // The first tick fires immediately; skip it, we just connected.
    interval.tick().await;
    loop {
        interval.tick().await;
        let frame = ClientFrame::Ping {
            msg_ref: next_ref(),
        };
        if let Ok(json) = serde_json::to_string(&frame) {
            let mut writer = ws_write.lock().await;
            if writer.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Command Forwarder
// ---------------------------------------------------------------------------

async fn command_forwarder<S>(
    mut command_rx: mpsc::Receiver<ClientCommand>,
    ws_write: Arc<Mutex<S>>,
    pending: PendingAcks,
) where
    S: futures_util::Sink<WsMessage> + Unpin,
{
    while let Some(cmd) = command_rx.recv().await {
        match cmd {
            ClientCommand::SendText { to, body, ack } => {
                let msg_ref = next_ref();
                let frame = ClientFrame::Send {
                    msg_ref: msg_ref.clone(),
                    to,
                    body,
                };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        let _ = ack.send(Err(ClientError::Transport(format!(
                            "frame serialization failed: {e}"
                        ))));
                        continue;
                    }
                };
                pending.lock().await.insert(msg_ref.clone(), ack);
                let send_failed = {
                    let mut writer = ws_write.lock().await;
                    writer.send(WsMessage::Text(json.into())).await.is_err()
                };
                if send_failed {
                    if let Some(ack) = pending.lock().await.remove(&msg_ref) {
                        let _ =
                            ack.send(Err(ClientError::Transport("websocket send failed".into())));
                    }
                }
            }
            ClientCommand::Disconnect => {
                let mut writer = ws_write.lock().await;
                let _ = writer.send(WsMessage::Close(None)).await;
                return;
            }
        }
    }
}
