/// Local web UI setup using `axum`.
///
/// Provides `WebContext` (shared state) and `WebServer` (startup logic).
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::sync::Mutex as TokioMutex;
use tracing::info;

use crate::config::Config;
use crate::rag::Session;
use crate::recommend::Recommender;
use crate::web::handlers;

/// Uploads above this size are rejected by axum before reaching a handler.
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Shared application context available to all handlers.
#[derive(Clone)]
pub struct WebContext {
    /// The one active document index; loads and questions are serialised.
    pub session: Arc<TokioMutex<Session>>,
    pub recommender: Arc<Recommender>,
    pub config: Arc<Config>,
}

#[derive(Clone)]
pub struct WebServer {
    pub ctx: WebContext,
}

impl WebServer {
    pub fn new(ctx: WebContext) -> Self {
        Self { ctx }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(handlers::index))
            .route("/load", post(handlers::load))
            .route("/ask", post(handlers::ask))
            .route("/recommend", get(handlers::recommend))
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .with_state(self.ctx.clone())
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let addr = self.ctx.config.bind_addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!("Web UI listening on http://{addr}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutting down web UI");
            })
            .await
            .context("web server encountered an error")?;

        Ok(())
    }
}
