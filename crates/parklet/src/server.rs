//! TCP listener and dispatcher.
//!
//! Accepts connections without bound, assigns each a fresh identity, and
//! spawns one handler task per connection. Only failures of the listening
//! endpoint itself are fatal; whatever happens inside a handler stays
//! inside that handler.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::info;

use crate::config::ServerConfig;
use crate::handler::ConnectionHandler;
use crate::pool::SlotPool;
use crate::protocol::ConnectionId;

/// Owns the listening endpoint and the shared slot pool handle.
pub struct Server {
    listener: TcpListener,
    pool: Arc<SlotPool>,
    next_seq: AtomicU64,
}

impl Server {
    /// Bind the listening endpoint. Bind failure is fatal to the caller.
    pub async fn bind(config: &ServerConfig, pool: Arc<SlotPool>) -> anyhow::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(config.backlog)?;

        info!(
            addr = %listener.local_addr()?,
            capacity = pool.capacity(),
            "parking lot server listening"
        );

        Ok(Self {
            listener,
            pool,
            next_seq: AtomicU64::new(0),
        })
    }

    /// The bound address (useful when the config asked for port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept until the accept call itself fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept until `shutdown` resolves; in-flight handlers finish on their
    /// own (no coordinated drain).
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    self.dispatch(stream, peer);
                }
                _ = &mut shutdown => {
                    info!("shutdown requested; closing listener");
                    return Ok(());
                }
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let id = ConnectionId::new(peer, seq);
        let pool = Arc::clone(&self.pool);
        tokio::spawn(ConnectionHandler::new(id, pool).run(stream));
    }
}

/// Wait for SIGINT or SIGTERM.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed, which only happens when
/// the tokio runtime is misconfigured - an unrecoverable startup error
/// worth failing fast on.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
