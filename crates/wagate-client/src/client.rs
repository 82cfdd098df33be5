//! Public handle for one gateway connection.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::address::normalize_recipient;
use crate::connection;
use crate::creds::AuthState;
use crate::error::ClientError;
use crate::protocol::ClientEvent;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to the chat gateway.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the gateway.
    pub gateway_url: String,
    /// Device name reported in the handshake.
    pub device_name: String,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Application-level keepalive interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// How long to wait for a send acknowledgment, in seconds.
    pub send_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: String::new(),
            device_name: "wagate".to_string(),
            connect_timeout_secs: 15,
            heartbeat_interval_secs: 25,
            send_timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Commands sent to the connection task from the application layer.
#[derive(Debug)]
pub enum ClientCommand {
    SendText {
        to: String,
        body: String,
        ack: oneshot::Sender<Result<(), ClientError>>,
    },
    Disconnect,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for one connection to the gateway.
///
/// Cheap to clone; all methods forward commands to the background
/// connection task. When that task ends (the connection closed), every
/// method returns `ClientError::NotConnected`. The handle is not
/// revived, a fresh one replaces it.
#[derive(Clone)]
pub struct ChatClient {
    command_tx: mpsc::Sender<ClientCommand>,
    send_timeout: Duration,
}

impl ChatClient {
    /// Open a connection and spawn its background task.
    /// Returns `(client, event_receiver)`.
    pub fn connect(config: ClientConfig, auth: AuthState) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);

        let client = Self {
            command_tx,
            send_timeout: Duration::from_secs(config.send_timeout_secs),
        };

        tokio::spawn(connection::run(config, auth, event_tx, command_rx));

        (client, event_rx)
    }

    /// Create a detached handle together with its command receiver,
    /// for driving the command stream with a transport of your own.
    pub fn channel() -> (Self, mpsc::Receiver<ClientCommand>) {
        let (command_tx, command_rx) = mpsc::channel(64);
        let client = Self {
            command_tx,
            send_timeout: Duration::from_secs(ClientConfig::default().send_timeout_secs),
        };
        (client, command_rx)
    }

    /// Send a text message and wait for the gateway acknowledgment.
    ///
    /// The recipient is normalized to a full network address before it
    /// reaches the wire.
    pub async fn send_text(&self, to: &str, body: &str) -> Result<(), ClientError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let cmd = ClientCommand::SendText {
            to: normalize_recipient(to),
            body: body.to_string(),
            ack: ack_tx,
        };
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::NotConnected)?;

        match tokio::time::timeout(self.send_timeout, ack_rx).await {
            Ok(Ok(result)) => result,
            // Connection task dropped the ack without answering.
            Ok(Err(_)) => Err(ClientError::NotConnected),
            Err(_) => Err(ClientError::SendTimeout(self.send_timeout.as_secs())),
        }
    }

    /// Ask the connection task to close the socket.
    pub async fn disconnect(&self) {
        let _ = self.command_tx.send(ClientCommand::Disconnect).await;
    }
}
