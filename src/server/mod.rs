pub mod routes;

pub use routes::{router, AppState};

use crate::config::schema::ServerConfig;
use crate::error::{Result, ShelfError};
use crate::models::Library;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// HTTP server for the library routes
pub struct Server {
    state: AppState,
    bind_address: String,
    route_base: String,
    ready_tx: Option<oneshot::Sender<SocketAddr>>,
}

impl Server {
    #[must_use]
    pub fn new(library: Arc<Library>, config: &ServerConfig) -> Self {
        Self {
            state: AppState::new(library),
            bind_address: config.bind_address.clone(),
            route_base: config.route_base.clone(),
            ready_tx: None,
        }
    }

    /// Report the bound address once listening (for testing)
    #[must_use]
    pub fn with_ready_signal(mut self, ready_tx: oneshot::Sender<SocketAddr>) -> Self {
        self.ready_tx = Some(ready_tx);
        self
    }

    /// Override the bind address (for testing, e.g. port 0)
    #[must_use]
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.bind_address).await.map_err(|e| {
            ShelfError::Config(format!("Failed to bind {}: {e}", self.bind_address))
        })?;
        let addr = listener.local_addr()?;

        tracing::info!("HTTP server listening on http://{addr}{}", self.route_base);

        if let Some(ready_tx) = self.ready_tx.take() {
            ready_tx.send(addr).ok();
        }

        axum::serve(listener, router(self.state, &self.route_base))
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl-C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
