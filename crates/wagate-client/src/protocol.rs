//! Wire protocol between this client and the chat gateway.
//!
//! The envelope is a small tagged JSON format. Everything inside the
//! credential blobs is opaque to us; the gateway owns that format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Frames this client sends to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// First frame on every connection: identifies the device and replays
    /// stored credentials (absent on a fresh, unpaired install).
    Hello {
        device_id: String,
        device_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        creds: Option<serde_json::Value>,
    },

    /// Outbound text message.
    Send {
        #[serde(rename = "ref")]
        msg_ref: String,
        to: String,
        body: String,
    },

    /// Application-level keepalive.
    Ping {
        #[serde(rename = "ref")]
        msg_ref: String,
    },
}

/// Frames the gateway sends back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A pairing challenge. Issued only while the session is unpaired.
    Qr { code: String },

    /// Updated credential material, keyed by file name. Must be persisted
    /// before the session can be resumed after a crash.
    CredsUpdate {
        files: HashMap<String, serde_json::Value>,
    },

    /// The session is authenticated and ready for traffic.
    Open,

    /// The gateway is closing the session.
    Close { reason: DisconnectReason },

    /// Acknowledgment of a `Send` or `Ping` frame.
    Ack {
        #[serde(rename = "ref")]
        msg_ref: String,
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Disconnect Reasons
// ---------------------------------------------------------------------------

/// Why a session closed. `LoggedOut` is the only terminal reason: the
/// pairing was revoked and a human has to scan a fresh QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    LoggedOut,
    ConnectionLost,
    ConnectionReplaced,
    Restart,
    Unknown,
}

// Manual impl so reasons this build does not know about map to
// `Unknown` instead of failing the whole close frame.
impl<'de> Deserialize<'de> for DisconnectReason {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "logged_out" => DisconnectReason::LoggedOut,
            "connection_lost" => DisconnectReason::ConnectionLost,
            "connection_replaced" => DisconnectReason::ConnectionReplaced,
            "restart" => DisconnectReason::Restart,
            _ => DisconnectReason::Unknown,
        })
    }
}

impl DisconnectReason {
    /// Terminal reasons must never trigger an automatic reconnect.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DisconnectReason::LoggedOut)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle events emitted by the connection task.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A pairing challenge was issued; render and display it.
    QrIssued(String),
    /// The gateway rotated credential material; persist before continuing.
    CredentialsUpdated(HashMap<String, serde_json::Value>),
    /// The session reached the authenticated, ready state.
    Opened,
    /// The connection ended. Emitted exactly once per connection task.
    Closed { reason: DisconnectReason },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_frame_round_trip() {
        let json = r#"{"type":"qr","code":"2@abc123"}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        assert!(matches!(frame, ServerFrame::Qr { ref code } if code == "2@abc123"));

        let json = r#"{"type":"close","reason":"logged_out"}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        assert!(matches!(
            frame,
            ServerFrame::Close {
                reason: DisconnectReason::LoggedOut
            }
        ));

        let json = r#"{"type":"ack","ref":"7","status":"ok"}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        match frame {
            ServerFrame::Ack {
                msg_ref,
                status,
                message,
            } => {
                assert_eq!(msg_ref, "7");
                assert_eq!(status, "ok");
                assert!(message.is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn client_frame_serializes_tagged() {
        let frame = ClientFrame::Send {
            msg_ref: "1".into(),
            to: "1234@s.whatsapp.net".into(),
            body: "hi".into(),
        };
        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "send");
        assert_eq!(json["ref"], "1");
        assert_eq!(json["to"], "1234@s.whatsapp.net");
    }

    #[test]
    fn hello_omits_absent_creds() {
        let frame = ClientFrame::Hello {
            device_id: "d".into(),
            device_name: "wagate".into(),
            creds: None,
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert!(!json.contains("creds"));
    }

    #[test]
    fn unknown_disconnect_reason_is_not_terminal() {
        let reason: DisconnectReason = serde_json::from_str("\"multidevice_mismatch\"").unwrap();
        assert_eq!(reason, DisconnectReason::Unknown);
        assert!(!reason.is_terminal());
        assert!(DisconnectReason::LoggedOut.is_terminal());
        assert!(!DisconnectReason::Restart.is_terminal());
    }
}
