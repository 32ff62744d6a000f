// Server loop module
// Owns the listening socket and runs the accept loop

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::connection::handle_connection;
use super::listener::create_listener;
use crate::config::AppState;
use crate::error::ServerError;
use crate::logger;

/// A bound server: the listening socket plus the state every connection shares.
///
/// Binding and serving are separate steps so that a bind failure is reported
/// before anything is announced or served.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<AppState>,
}

impl Server {
    /// Bind the configured `server.host:server.port`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn bind(state: Arc<AppState>) -> Result<Self, ServerError> {
        let addr = state.config.get_socket_addr()?;
        let listener = create_listener(addr).map_err(|source| ServerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        Ok(Self {
            listener,
            local_addr,
            state,
        })
    }

    /// The bound address; differs from the configured one when port 0 was asked for
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub const fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Accept connections until the process is killed
    pub async fn run(self) {
        self.run_until(std::future::pending()).await;
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks; only
    /// the listener is closed.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            handle_connection(stream, peer_addr, Arc::clone(&self.state));
                        }
                        Err(e) => {
                            logger::log_error(&format!("Failed to accept connection: {e}"));
                        }
                    }
                }

                () = &mut shutdown => {
                    logger::log_info(&format!("Shutting down listener on {}", self.local_addr));
                    break;
                }
            }
        }
    }
}
