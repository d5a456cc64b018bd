//! HTTP server

use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::AppState;
use crate::api::router::build_router;

pub struct ApiServer {
    bind: SocketAddr,
    state: AppState,
}

impl ApiServer {
    pub fn new(bind: SocketAddr, state: AppState) -> Self {
        Self { bind, state }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Serve until `shutdown` resolves.
    pub async fn run_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let grace = self.state.stop_grace;
        let router = build_router(self.state);
        let listener = TcpListener::bind(self.bind).await?;

        info!(
            bind = %listener.local_addr()?,
            stop_grace_secs = grace.as_secs(),
            "Starting gateway"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}
