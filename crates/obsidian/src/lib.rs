//! Connection state machine and session manager for Obsidian.
//!
//! A [`Server`] accepts sockets and runs one [`Connection`] task per
//! client. Each connection walks the handshake into status or login, and
//! logged-in connections are tracked by UUID until they leave.

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod server;
pub mod utils;

pub use config::ServerConfig;
pub use connection::{Connection, Profile, Reader};
pub use error::{ConnectionError, ServerError};
pub use handler::{Flow, PacketHandler};
pub use server::{SHUTDOWN_REASON, Server};
