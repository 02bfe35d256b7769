//! Wire protocol types for the parking lot service.
//!
//! Plain text, one request per message, exact token match (case-sensitive,
//! surrounding ASCII whitespace ignored). Replies are bare decimal integers;
//! `-1` answers anything unrecognized.

use std::fmt;
use std::net::SocketAddr;

/// Unique identity of one accepted connection.
///
/// Peer address plus a sequence number assigned by the listener before the
/// handler starts. Slot ownership is tracked against this, not against the
/// client host, so a reconnecting client gets a fresh identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    addr: SocketAddr,
    seq: u64,
}

impl ConnectionId {
    pub fn new(addr: SocketAddr, seq: u64) -> Self {
        Self { addr, seq }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.addr, self.seq)
    }
}

/// The three commands a client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `consultar_vaga` - how many slots are free.
    Query,
    /// `pegar_vaga` - try to take a slot.
    Acquire,
    /// `liberar_vaga` - give the held slot back; success ends the session.
    Release,
}

impl Command {
    pub fn token(&self) -> &'static str {
        match self {
            Self::Query => "consultar_vaga",
            Self::Acquire => "pegar_vaga",
            Self::Release => "liberar_vaga",
        }
    }
}

/// One parsed inbound frame: a recognized command or the raw text of an
/// unrecognized one (kept for the log line; answered with `-1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Command(Command),
    Unknown(String),
}

impl Request {
    pub fn parse(bytes: &[u8]) -> Self {
        let text = String::from_utf8_lossy(bytes);
        match text.trim() {
            "consultar_vaga" => Self::Command(Command::Query),
            "pegar_vaga" => Self::Command(Command::Acquire),
            "liberar_vaga" => Self::Command(Command::Release),
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Server replies, encoded as bare decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Answer to a query: the free-slot count.
    Count(usize),
    /// Acquire or release succeeded.
    Granted,
    /// Acquire or release failed.
    Denied,
    /// Unrecognized-command sentinel.
    Invalid,
}

impl Reply {
    pub fn from_outcome(ok: bool) -> Self {
        if ok { Self::Granted } else { Self::Denied }
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Count(n) => n.to_string(),
            Self::Granted => "1".to_string(),
            Self::Denied => "0".to_string(),
            Self::Invalid => "-1".to_string(),
        }
    }
}

/// Raw numeric reply as seen by the client side.
///
/// The wire does not distinguish a count of `1` from an acquire success;
/// the caller interprets the number against the command it sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReply(pub i64);

impl RawReply {
    pub fn parse(bytes: &[u8]) -> Result<Self, ReplyParseError> {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        text.parse::<i64>()
            .map(Self)
            .map_err(|_| ReplyParseError(text.to_string()))
    }

    pub fn is_invalid_sentinel(&self) -> bool {
        self.0 == -1
    }

    pub fn as_granted(&self) -> bool {
        self.0 == 1
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed reply from server: {0:?}")]
pub struct ReplyParseError(pub String);
