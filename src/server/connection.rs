// Connection handling module
// Serves one accepted TCP connection on its own task

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;
use crate::nocache::NoCache;

use super::io::{HeadQueue, NoCacheIo};

/// Handle a single connection in a spawned task.
///
/// The task:
/// 1. Wraps the TCP stream in `NoCacheIo` and `TokioIo`, so that error
///    replies hyper writes on its own are cache-busted too
/// 2. Configures the HTTP/1 connection (keep-alive)
/// 3. Serves requests through the no-cache decorated handler
/// 4. Applies the optional connection timeout
pub fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let heads = HeadQueue::default();
        let io = TokioIo::new(NoCacheIo::new(stream, heads.clone()));
        let timeout_secs = state.config.performance.connection_timeout;

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.performance.keep_alive);

        let svc_state = Arc::clone(&state);
        let service = NoCache::new(service_fn(move |req: Request<Incoming>| {
            heads.push(req.method() == Method::HEAD);
            handler::handle_request(req, Arc::clone(&svc_state), peer_addr)
        }));

        let conn = builder.serve_connection(io, service);

        if timeout_secs == 0 {
            if let Err(err) = conn.await {
                logger::log_connection_error(&err);
            }
            return;
        }

        match tokio::time::timeout(Duration::from_secs(timeout_secs), conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} timed out after {timeout_secs} seconds"
                ));
            }
        }
    });
}
