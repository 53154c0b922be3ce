//! HTTP server lifecycle

use crate::api::build_router;
use crate::handlers::AppState;
use crate::shutdown::Shutdown;
use anyhow::Result;
use chback_core::config::ServerConfig;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Bound HTTP server, ready to run
pub struct ApiServer {
    listener: TcpListener,
    state: AppState,
    shutdown_timeout: Duration,
}

impl ApiServer {
    pub async fn bind(state: AppState, config: &ServerConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        Ok(Self {
            listener,
            state,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` fires, then give in-flight requests
    /// `shutdown_timeout` to finish
    pub async fn run(self, shutdown: Shutdown) -> Result<()> {
        let addr = self.listener.local_addr()?;
        let router = build_router(self.state);
        info!(%addr, "HTTP API listening");

        let drain = {
            let shutdown = shutdown.clone();
            async move { shutdown.wait().await }
        };
        let server = axum::serve(self.listener, router)
            .with_graceful_shutdown(drain)
            .into_future();
        tokio::pin!(server);

        tokio::select! {
            result = &mut server => result?,
            _ = shutdown.wait() => {
                match tokio::time::timeout(self.shutdown_timeout, &mut server).await {
                    Ok(result) => result?,
                    Err(_) => warn!(
                        timeout = ?self.shutdown_timeout,
                        "In-flight requests did not finish in time"
                    ),
                }
            }
        }

        info!("HTTP API stopped");
        Ok(())
    }
}
