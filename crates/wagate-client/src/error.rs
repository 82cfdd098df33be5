use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("connect timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("not connected")]
    NotConnected,

    #[error("send rejected by gateway: {0}")]
    Rejected(String),

    #[error("send timed out after {0}s")]
    SendTimeout(u64),

    #[error("invalid credential file name: {0}")]
    InvalidCredentialName(String),

    #[error("credential directory unusable: {0}")]
    CredentialDir(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
