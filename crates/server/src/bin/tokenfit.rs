//! Standalone tokenfit server.
//!
//! Serves the shaping pipeline over an in-memory data source; a real
//! deployment supplies a `DataSource` backed by the upstream API client.
//! Config comes from `TOKENFIT_CONFIG` (default `tokenfit.toml`), bind
//! address from `TOKENFIT_HTTP` (default `127.0.0.1:3000`). SIGHUP
//! triggers a config reload.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokenfit_server::{init_tracing, router, AppState, ConfigHandle, InMemorySource};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config_path = std::env::var("TOKENFIT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("tokenfit.toml"));
    let config = ConfigHandle::load(Some(config_path))?;
    let state = AppState::new(config.clone(), Arc::new(InMemorySource::default()));

    #[cfg(unix)]
    {
        let config = config.clone();
        tokio::spawn(async move {
            let Ok(mut hangup) =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())
            else {
                return;
            };
            while hangup.recv().await.is_some() {
                if let Err(error) = config.reload() {
                    tracing::warn!(
                        target: "tokenfit::config",
                        error = %error,
                        "config reload failed; keeping previous snapshot"
                    );
                }
            }
        });
    }

    let addr = std::env::var("TOKENFIT_HTTP").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(target: "tokenfit::serve", %addr, "listening");
    axum::serve(listener, router(state))
        .await
        .context("serving")?;
    Ok(())
}
