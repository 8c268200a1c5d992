//! Server execution logic.

use std::{future::Future, sync::Arc};

use tokio::net::TcpListener;

use crate::{config::ServerConfig, websocket::CLOSE_GOING_AWAY};

use super::{
    handler::handle_connection, scheduler::spawn_scheduler, signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat server
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(AppState::in_memory(Arc::new(SystemClock)));
/// let server = Server::new(state, ServerConfig::default());
/// server.run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl Server {
    pub fn new(state: Arc<AppState>, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Bind to the configured address and serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the configured address.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bind_addr = self.config.bind_addr();
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!(
            "WebSocket chat server listening on {}",
            listener.local_addr()?
        );
        tracing::info!("Connect to: ws://{}", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await;
        tracing::info!("Server shutdown complete");
        Ok(())
    }

    /// Accept connections on `listener` until `shutdown` resolves.
    ///
    /// On shutdown the scheduler is stopped and every logged-in session is
    /// closed with 1001 (going away).
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let scheduler = spawn_scheduler(
            self.state.deliver_scheduled_usecase.clone(),
            self.config.scheduler_interval,
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        tracing::debug!("Accepted TCP connection from {}", peer_addr);
                        tokio::spawn(handle_connection(
                            stream,
                            peer_addr,
                            self.state.clone(),
                            self.config.connection,
                        ));
                    }
                    Err(e) => tracing::error!("Failed to accept connection: {}", e),
                },
            }
        }

        scheduler.abort();
        let sessions = self.state.sessions.snapshot(|_| true).await;
        tracing::info!("Closing {} session(s)", sessions.len());
        for (username, sink) in sessions {
            tracing::debug!("Closing session of '{}'", username);
            sink.close(CLOSE_GOING_AWAY, "server shutting down").await;
        }
    }
}
