//! In-memory log buffering for the `log` request
//!
//! This module handles:
//! - Buffering formatted log lines from every thread
//! - Snapshot-windowed draining, one line per pull
//! - Wiring the buffer into the global tracing subscriber

mod buffer;
mod layer;

pub use buffer::{LogBuffer, DEFAULT_CAPACITY};
pub use layer::{init_tracing, BufferLayer, LogOutput};
