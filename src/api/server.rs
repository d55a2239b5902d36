//! HTTP server lifecycle.
//!
//! `serve` runs the API in the foreground until Ctrl-C or SIGTERM.
//! `start_on` binds, spawns the server in a background task and returns a
//! handle with a shutdown channel.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Handle to a server running in a background task.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

async fn bind(addr: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(addr).await.map_err(|source| ServerError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Bind `addr` and serve in the background.
pub async fn start_on(ctx: ApiContext, addr: &str) -> Result<ApiServer, ServerError> {
    let listener = bind(addr).await?;
    let addr = listener.local_addr().map_err(ServerError::Serve)?;
    let app = api_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!("API server error: {e}");
        }
        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// Bind `HOST:PORT` and serve until a termination signal arrives.
pub async fn serve(ctx: ApiContext) -> Result<(), ServerError> {
    let config = &ctx.core.config;
    let listener = bind(&format!("{}:{}", config.host, config.port)).await?;
    let addr = listener.local_addr().map_err(ServerError::Serve)?;

    tracing::info!(environment = %config.environment, "Server running on {addr}");
    let app = api_router(ctx);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    tracing::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::TestApp;

    #[tokio::test]
    async fn start_and_stop_server() {
        let app = TestApp::new().await;
        let mut server = start_on(app.ctx.clone(), "127.0.0.1:0")
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "API is running");

        server.shutdown();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn serves_public_reads_and_rejects_anonymous_writes() {
        let app = TestApp::new().await;
        let mut server = start_on(app.ctx.clone(), "127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", server.addr);
        let client = reqwest::Client::new();

        let resp = client.get(format!("{base}/api/hospitals")).send().await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let resp = client
            .post(format!("{base}/api/hospitals"))
            .json(&serde_json::json!({ "name": "A", "country": "B" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        let resp = client
            .post(format!("{base}/api/hospitals"))
            .bearer_auth(&app.admin_token)
            .json(&serde_json::json!({ "name": "A", "country": "B" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

        server.shutdown();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let app = TestApp::new().await;
        let first = start_on(app.ctx.clone(), "127.0.0.1:0").await.unwrap();
        let taken = first.addr.to_string();
        let result = start_on(app.ctx.clone(), &taken).await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let app = TestApp::new().await;
        let mut server = start_on(app.ctx.clone(), "127.0.0.1:0").await.unwrap();
        server.shutdown();
        server.shutdown();
    }
}
