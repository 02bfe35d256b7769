//! parklet: TCP slot-allocation server for parking lot simulations.
//!
//! A fixed pool of interchangeable parking slots shared by many concurrent
//! clients over a small text protocol. The core guarantees: no
//! over-allocation, release tied to the acquiring connection, and
//! reclamation of slots held by connections that die uncleanly.

pub mod client;
pub mod codec;
pub mod config;
pub mod handler;
pub mod pool;
pub mod protocol;
pub mod server;

pub use client::{ClientError, ParkingClient};
pub use config::ServerConfig;
pub use handler::ConnectionHandler;
pub use pool::{LotSnapshot, SlotPool};
pub use protocol::{Command, ConnectionId, Reply, Request};
pub use server::{Server, shutdown_signal};
