//! HTTP upload surface.
//!
//! Accepts one document per request on `POST /upload`, stores it under the
//! upload directory and returns its classification record as JSON.

mod handlers;
mod routes;

pub use routes::create_router;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::pipeline::Pipeline;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// Each upload is stored in its own subdirectory here.
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, upload_dir: PathBuf) -> Self {
        Self {
            pipeline,
            upload_dir,
        }
    }
}

/// Bind a listener; `host` may be an IP address or a resolvable hostname.
async fn bind(host: &str, port: u16) -> anyhow::Result<TcpListener> {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))
}

/// Start the web server.
pub async fn serve(
    pipeline: Arc<Pipeline>,
    upload_dir: PathBuf,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&upload_dir).await?;
    let app = create_router(AppState::new(pipeline, upload_dir));

    let listener = bind(host, port).await?;
    tracing::info!("Starting server at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
