//! wagate: HTTP façade over a persistent chat-network session.
//!
//! Exposes the pairing QR and an outbound-message endpoint; the session
//! itself lives in a background task that reconnects with capped
//! backoff until the network logs the device out.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use wagate_client::CredentialStore;
use wagate_server::api::{self, AppState};
use wagate_server::config;
use wagate_server::session::{self, SessionContext};

#[derive(Parser)]
#[command(name = "wagate", about = "HTTP gateway for a persistent chat-network session")]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the HTTP listen address.
    #[arg(long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wagate_server=info,wagate_client=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = match config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            std::process::exit(1);
        }
    };

    let store = match CredentialStore::open(&config.session.auth_dir) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open credential store");
            std::process::exit(1);
        }
    };

    // The session opens eagerly; HTTP handlers read whatever state it
    // has reached so far.
    let ctx = Arc::new(SessionContext::new());
    tokio::spawn(session::run(
        Arc::clone(&ctx),
        config.chat.clone(),
        config.session.clone(),
        store,
    ));

    let state = AppState {
        session: ctx,
        admin_number: config.admin_number.clone(),
    };
    let app = api::router(state);

    let listen = args.listen.unwrap_or_else(|| config.http.listen.clone());
    let listener = TcpListener::bind(&listen)
        .await
        .expect("Failed to bind TCP listener");

    tracing::info!("wagate listening on {}", listen);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "HTTP server error");
    }
}
