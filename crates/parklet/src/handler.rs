//! Per-connection protocol loop.
//!
//! Idle → Holding → Closed. A successful release proactively ends the
//! session (a client wanting another slot opens a new connection). Whatever
//! path closes the session, the drop cleanup hands any held slot back.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::codec::ServerCodec;
use crate::pool::SlotPool;
use crate::protocol::{Command, ConnectionId, Reply, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Holding,
    Closed,
}

/// Handles one accepted connection for its whole lifetime.
pub struct ConnectionHandler {
    id: ConnectionId,
    pool: Arc<SlotPool>,
    state: SessionState,
}

impl ConnectionHandler {
    pub fn new(id: ConnectionId, pool: Arc<SlotPool>) -> Self {
        Self {
            id,
            pool,
            state: SessionState::Idle,
        }
    }

    /// Run the request/response loop until the peer disconnects, I/O fails,
    /// or a release ends the session.
    ///
    /// Works over any AsyncRead/AsyncWrite so tests can drive it with
    /// in-memory streams.
    pub async fn run<S>(mut self, io: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        tracing::info!(conn = %self.id, "client connected");
        let mut framed = Framed::new(io, ServerCodec);

        while let Some(inbound) = framed.next().await {
            let request = match inbound {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!(conn = %self.id, error = %e, "read failed; closing session");
                    break;
                }
            };

            let (reply, end_session) = self.dispatch(&request);
            if let Err(e) = framed.send(reply).await {
                tracing::warn!(conn = %self.id, error = %e, "write failed; closing session");
                break;
            }
            if end_session {
                break;
            }
        }

        if self.state == SessionState::Holding {
            tracing::warn!(conn = %self.id, "session ended while holding a slot");
        }
        self.state = SessionState::Closed;
        tracing::info!(conn = %self.id, "client disconnected");
    }

    /// Apply one request to the pool. Returns the reply and whether the
    /// session ends after sending it.
    fn dispatch(&mut self, request: &Request) -> (Reply, bool) {
        match request {
            Request::Command(Command::Query) => {
                let available = self.pool.query();
                tracing::info!(conn = %self.id, available, "query");
                (Reply::Count(available), false)
            }
            Request::Command(Command::Acquire) => {
                let granted = self.pool.acquire(self.id);
                if granted {
                    self.state = SessionState::Holding;
                    tracing::info!(conn = %self.id, available = self.pool.query(), "slot acquired");
                } else {
                    tracing::info!(conn = %self.id, "acquire denied; lot full");
                }
                (Reply::from_outcome(granted), false)
            }
            Request::Command(Command::Release) => {
                let released = self.pool.release(self.id);
                if released {
                    self.state = SessionState::Idle;
                    tracing::info!(conn = %self.id, available = self.pool.query(), "slot released");
                } else {
                    tracing::warn!(conn = %self.id, "release without a held slot");
                }
                (Reply::from_outcome(released), released)
            }
            Request::Unknown(text) => {
                tracing::warn!(conn = %self.id, command = %text, "unrecognized command");
                (Reply::Invalid, false)
            }
        }
    }
}

impl Drop for ConnectionHandler {
    /// Unconditional cleanup on every exit path: a no-op when the session
    /// holds nothing, otherwise the slot goes back to the pool so a crashed
    /// client can never leak it.
    fn drop(&mut self) {
        if self.pool.release(self.id) {
            tracing::info!(
                conn = %self.id,
                available = self.pool.query(),
                "slot reclaimed on disconnect"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio_util::codec::Framed as ClientFramed;

    use crate::codec::ClientCodec;
    use crate::protocol::RawReply;

    fn cid(seq: u64) -> ConnectionId {
        ConnectionId::new("127.0.0.1:9000".parse().unwrap(), seq)
    }

    #[test]
    fn release_without_hold_is_denied_and_keeps_session() {
        let pool = Arc::new(SlotPool::new(1));
        let mut handler = ConnectionHandler::new(cid(0), Arc::clone(&pool));

        let (reply, end) = handler.dispatch(&Request::Command(Command::Release));
        assert_eq!(reply, Reply::Denied);
        assert!(!end);
        assert_eq!(pool.query(), 1);
    }

    #[test]
    fn release_success_ends_session() {
        let pool = Arc::new(SlotPool::new(1));
        let mut handler = ConnectionHandler::new(cid(0), Arc::clone(&pool));

        let (reply, end) = handler.dispatch(&Request::Command(Command::Acquire));
        assert_eq!(reply, Reply::Granted);
        assert!(!end);

        let (reply, end) = handler.dispatch(&Request::Command(Command::Release));
        assert_eq!(reply, Reply::Granted);
        assert!(end);
        assert_eq!(pool.query(), 1);
    }

    #[test]
    fn unknown_command_answers_sentinel_without_state_change() {
        let pool = Arc::new(SlotPool::new(3));
        let mut handler = ConnectionHandler::new(cid(0), Arc::clone(&pool));

        let (reply, end) = handler.dispatch(&Request::Unknown("estacionar".to_string()));
        assert_eq!(reply, Reply::Invalid);
        assert!(!end);
        assert_eq!(pool.query(), 3);
    }

    #[tokio::test]
    async fn query_acquire_release_over_stream() {
        let pool = Arc::new(SlotPool::new(2));
        let (server_io, client_io) = tokio::io::duplex(1024);
        let task = tokio::spawn(ConnectionHandler::new(cid(0), Arc::clone(&pool)).run(server_io));

        let mut peer = ClientFramed::new(client_io, ClientCodec);

        peer.send(Command::Query).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(2));

        peer.send(Command::Acquire).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));
        assert_eq!(pool.query(), 1);

        peer.send(Command::Release).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));

        // Release success closes the session from the server side.
        task.await.unwrap();
        assert_eq!(pool.query(), 2);
        assert_eq!(peer.next().await.map(|r| r.ok()), None);
    }

    #[tokio::test]
    async fn double_acquire_does_not_double_count() {
        let pool = Arc::new(SlotPool::new(2));
        let (server_io, client_io) = tokio::io::duplex(1024);
        let _task = tokio::spawn(ConnectionHandler::new(cid(0), Arc::clone(&pool)).run(server_io));

        let mut peer = ClientFramed::new(client_io, ClientCodec);

        peer.send(Command::Acquire).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));

        peer.send(Command::Acquire).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));

        peer.send(Command::Query).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));
    }

    #[tokio::test]
    async fn peer_disconnect_reclaims_held_slot() {
        let pool = Arc::new(SlotPool::new(1));
        let (server_io, client_io) = tokio::io::duplex(1024);
        let task = tokio::spawn(ConnectionHandler::new(cid(0), Arc::clone(&pool)).run(server_io));

        let mut peer = ClientFramed::new(client_io, ClientCodec);
        peer.send(Command::Acquire).await.unwrap();
        assert_eq!(peer.next().await.unwrap().unwrap(), RawReply(1));
        assert_eq!(pool.query(), 0);

        // Vanish without releasing.
        drop(peer);
        task.await.unwrap();
        assert_eq!(pool.query(), 1);
    }

    #[tokio::test]
    async fn invalid_bytes_keep_connection_open() {
        let pool = Arc::new(SlotPool::new(1));
        let (server_io, client_io) = tokio::io::duplex(1024);
        let _task = tokio::spawn(ConnectionHandler::new(cid(0), Arc::clone(&pool)).run(server_io));

        let (mut read_half, mut write_half) = tokio::io::split(client_io);

        write_half.write_all(b"abre_o_portao").await.unwrap();
        let mut buf = [0u8; 1024];
        let n = read_half.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"-1");
        assert_eq!(pool.query(), 1);

        // Still serving after the bad command.
        write_half.write_all(b"consultar_vaga").await.unwrap();
        let n = read_half.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"1");
    }
}
