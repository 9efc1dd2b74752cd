//! Local request/response transports
//!
//! Each transport binds an endpoint and serves one client session per
//! [`Transport::start`]. Requests and responses are single text lines.

mod session;
pub mod tcp;
pub mod traits;
#[cfg(unix)]
pub mod unix;

pub use session::{serve_session, SessionEnd, SessionLimits};
pub use tcp::TcpTransport;
pub use traits::{RequestHandler, ServerHandle, Transport};
#[cfg(unix)]
pub use unix::UnixSocketTransport;
