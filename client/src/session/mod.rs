//! Session with the update service
//!
//! This module handles:
//! - Connecting over a Unix socket or loopback TCP
//! - Request/response exchange, one line each way
//! - Draining one log batch and disconnecting

mod connection;

pub use connection::{Endpoint, ServiceConnection};
