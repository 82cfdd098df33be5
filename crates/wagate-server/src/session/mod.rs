//! Session lifecycle: owns the chat client handle, reacts to gateway
//! events, and drives reconnection.

mod fsm;

pub use fsm::{Backoff, ConnectionState, StateEvent};

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{error, info, warn};
use wagate_client::{AuthState, ChatClient, ClientEvent, CredentialStore, DisconnectReason};

use crate::config::{ChatConfig, SessionConfig};
use crate::qr;

// ---------------------------------------------------------------------------
// Shared Context
// ---------------------------------------------------------------------------

/// Session state shared between the runner (writer) and the HTTP layer
/// (readers). Every mutation is a single whole-value swap.
pub struct SessionContext {
    state: RwLock<ConnectionState>,
    client: RwLock<Option<ChatClient>>,
    qr: RwLock<Option<String>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(ConnectionState::Connecting),
            client: RwLock::new(None),
            qr: RwLock::new(None),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_open(&self) -> bool {
        self.state.read().await.is_open()
    }

    pub async fn apply(&self, event: StateEvent) {
        let mut state = self.state.write().await;
        *state = state.apply(event);
    }

    /// Current client handle, if a connection attempt has produced one.
    pub async fn client(&self) -> Option<ChatClient> {
        self.client.read().await.clone()
    }

    pub async fn set_client(&self, client: ChatClient) {
        *self.client.write().await = Some(client);
    }

    /// Latest pairing QR as a data URI, if one is cached.
    pub async fn qr_data_uri(&self) -> Option<String> {
        self.qr.read().await.clone()
    }

    pub async fn set_qr(&self, data_uri: String) {
        *self.qr.write().await = Some(data_uri);
    }

    pub async fn clear_qr(&self) {
        *self.qr.write().await = None;
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run the session until it closes terminally.
///
/// Each loop iteration owns exactly one connection attempt; the client
/// handle is replaced, never revived, on reconnect. A terminal logout
/// (or the optional attempt cap) ends the loop; a human has to re-pair.
pub async fn run(
    ctx: Arc<SessionContext>,
    chat: ChatConfig,
    session: SessionConfig,
    store: CredentialStore,
) {
    let mut backoff = Backoff::new(
        session.reconnect_delay_secs,
        session.max_reconnect_delay_secs,
    );
    let mut attempts: u32 = 0;

    loop {
        let (opened, reason) = connect_once(&ctx, &chat, &store).await;
        if opened {
            backoff.reset();
            attempts = 0;
        }

        let terminal = reason.is_terminal();
        ctx.apply(StateEvent::Closed { terminal }).await;

        if terminal {
            error!("Logged out by the network; clear the auth directory and re-pair");
            return;
        }

        attempts += 1;
        if let Some(max) = session.max_reconnect_attempts {
            if attempts >= max {
                error!(attempts, "Reconnect attempt cap reached; giving up");
                ctx.apply(StateEvent::Closed { terminal: true }).await;
                return;
            }
        }

        let delay = backoff.next_delay();
        info!(delay_secs = delay.as_secs(), "Reconnecting to chat gateway");
        tokio::time::sleep(delay).await;
    }
}

/// Drive one connection attempt to completion. Returns whether the
/// session reached `Open` and the reason the connection ended.
async fn connect_once(
    ctx: &SessionContext,
    chat: &ChatConfig,
    store: &CredentialStore,
) -> (bool, DisconnectReason) {
    // Reread credentials each attempt; an update may have landed during
    // the previous connection.
    let auth = match store.load() {
        Ok(auth) => auth,
        Err(e) => {
            warn!(error = %e, "Failed to load credentials; starting unpaired");
            AuthState::default()
        }
    };

    ctx.apply(StateEvent::ConnectStarted).await;
    let (client, events) = ChatClient::connect(chat.client_config(), auth);
    ctx.set_client(client).await;

    drain_events(ctx, store, events).await
}

/// Apply gateway events to the shared context until the connection ends.
pub(crate) async fn drain_events(
    ctx: &SessionContext,
    store: &CredentialStore,
    mut events: mpsc::Receiver<ClientEvent>,
) -> (bool, DisconnectReason) {
    let mut opened = false;
    while let Some(event) = events.recv().await {
        match event {
            ClientEvent::CredentialsUpdated(files) => {
                // Must hit disk before the next event is processed; a
                // crash afterwards must not lose pairing state.
                if let Err(e) = store.save(&files) {
                    error!(error = %e, "Failed to persist credentials");
                }
            }
            ClientEvent::QrIssued(code) => match qr::data_uri(&code) {
                Some(uri) => {
                    ctx.set_qr(uri).await;
                    info!("Pairing QR ready; serve it from /qr");
                }
                None => warn!("Failed to render pairing QR"),
            },
            ClientEvent::Opened => {
                opened = true;
                ctx.apply(StateEvent::Opened).await;
                ctx.clear_qr().await;
                info!("Chat session ready");
            }
            ClientEvent::Closed { reason } => return (opened, reason),
        }
    }
    // Event channel closed without a close frame; treat as lost.
    (opened, DisconnectReason::ConnectionLost)
}
