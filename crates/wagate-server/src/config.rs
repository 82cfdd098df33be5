//! TOML configuration schema and loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use wagate_client::ClientConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config read error: {0}")]
    ReadError(String),

    #[error("config parse error: {0}")]
    ParseError(String),
}

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Phone number returned by the admin-number route.
    pub admin_number: String,
    pub http: HttpConfig,
    pub chat: ChatConfig,
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            admin_number: "6281234567890".into(),
            http: HttpConfig::default(),
            chat: ChatConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address the HTTP server binds to.
    pub listen: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".into(),
        }
    }
}

/// Settings for the connection to the chat gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// WebSocket URL of the chat gateway.
    pub gateway_url: String,
    /// Device name reported during pairing.
    pub device_name: String,
    pub connect_timeout_secs: u64,
    pub heartbeat_interval_secs: u64,
    pub send_timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            gateway_url: "ws://127.0.0.1:8765/ws".into(),
            device_name: "wagate".into(),
            connect_timeout_secs: 60,
            heartbeat_interval_secs: 25,
            send_timeout_secs: 30,
        }
    }
}

impl ChatConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            gateway_url: self.gateway_url.clone(),
            device_name: self.device_name.clone(),
            connect_timeout_secs: self.connect_timeout_secs,
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            send_timeout_secs: self.send_timeout_secs,
        }
    }
}

/// Session persistence and reconnect policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Directory holding the opaque credential files.
    pub auth_dir: PathBuf,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// Give up after this many consecutive failed attempts. `None`
    /// retries forever (with capped backoff).
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_dir: PathBuf::from("auth_info"),
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            max_reconnect_attempts: None,
        }
    }
}

/// Load config from an explicit path, or from `wagate.toml` in the
/// working directory, or fall back to defaults when neither exists.
pub fn load(path: Option<&Path>) -> Result<ServerConfig, ConfigError> {
    match path {
        Some(path) => load_from_path(path),
        None => {
            let default = Path::new("wagate.toml");
            if default.exists() {
                load_from_path(default)
            } else {
                info!("no config file found, using defaults");
                Ok(ServerConfig::default())
            }
        }
    }
}

/// Load config from a specific TOML file path.
///
/// Missing fields fall back to their serde defaults.
pub fn load_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ReadError(format!("failed to read {}: {e}", path.display())))?;

    let config: ServerConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ServerConfig::default();
        assert_eq!(config.admin_number, "6281234567890");
        assert_eq!(config.http.listen, "0.0.0.0:3000");
        assert_eq!(config.session.auth_dir, PathBuf::from("auth_info"));
        assert_eq!(config.session.reconnect_delay_secs, 1);
        assert_eq!(config.session.max_reconnect_delay_secs, 30);
        assert!(config.session.max_reconnect_attempts.is_none());
        assert_eq!(config.chat.connect_timeout_secs, 60);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let toml = r#"
            admin_number = "15551234567"

            [http]
            listen = "127.0.0.1:8080"

            [session]
            max_reconnect_attempts = 5
        "#;
        let config: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.admin_number, "15551234567");
        assert_eq!(config.http.listen, "127.0.0.1:8080");
        assert_eq!(config.session.max_reconnect_attempts, Some(5));
        // Untouched sections keep their defaults.
        assert_eq!(config.chat.device_name, "wagate");
        assert_eq!(config.session.reconnect_delay_secs, 1);
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wagate.toml");
        std::fs::write(&path, "admin_number = \"777\"\n").unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.admin_number, "777");
    }

    #[test]
    fn load_from_missing_path_is_read_error() {
        let err = load_from_path(Path::new("/nonexistent/wagate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }

    #[test]
    fn chat_config_maps_to_client_config() {
        let chat = ChatConfig {
            gateway_url: "wss://gw.example.net/ws".into(),
            device_name: "bot-1".into(),
            connect_timeout_secs: 10,
            heartbeat_interval_secs: 20,
            send_timeout_secs: 5,
        };
        let client = chat.client_config();
        assert_eq!(client.gateway_url, "wss://gw.example.net/ws");
        assert_eq!(client.device_name, "bot-1");
        assert_eq!(client.connect_timeout_secs, 10);
        assert_eq!(client.heartbeat_interval_secs, 20);
        assert_eq!(client.send_timeout_secs, 5);
    }
}
