//! Typed client for the parking lot protocol.
//!
//! One command per round trip, matching the server's one-request-per-message
//! framing. Used by the simulator and by end-to-end tests.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::codec::ClientCodec;
use crate::protocol::{Command, RawReply};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server closed the connection")]
    ConnectionClosed,

    /// The server answered `-1`, which a well-formed client never triggers.
    #[error("server did not recognize the command")]
    Rejected,
}

pub struct ParkingClient {
    framed: Framed<TcpStream, ClientCodec>,
}

impl ParkingClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, ClientCodec),
        })
    }

    /// Free-slot count as reported by the server.
    pub async fn query(&mut self) -> Result<usize, ClientError> {
        let reply = self.round_trip(Command::Query).await?;
        usize::try_from(reply.0).map_err(|_| ClientError::Rejected)
    }

    /// `true` when the server granted a slot.
    pub async fn acquire(&mut self) -> Result<bool, ClientError> {
        Ok(self.round_trip(Command::Acquire).await?.as_granted())
    }

    /// `true` when the held slot was given back. Success also ends the
    /// session on the server side.
    pub async fn release(&mut self) -> Result<bool, ClientError> {
        Ok(self.round_trip(Command::Release).await?.as_granted())
    }

    async fn round_trip(&mut self, command: Command) -> Result<RawReply, ClientError> {
        self.framed.send(command).await?;
        let reply = self
            .framed
            .next()
            .await
            .ok_or(ClientError::ConnectionClosed)??;
        if reply.is_invalid_sentinel() {
            return Err(ClientError::Rejected);
        }
        Ok(reply)
    }
}
