//! Snapshot-windowed log buffer
//!
//! Producers append from any thread. The single consumer drains the buffer one
//! line per pull, in sessions: the first pull of a session fixes a boundary
//! instant, and the session ends (empty string) at the first entry appended
//! after that boundary, even if the buffer is not empty.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Initial entry capacity when none is configured
pub const DEFAULT_CAPACITY: usize = 256;

/// One buffered line
#[derive(Debug)]
pub struct LogEntry {
    pub timestamp: Instant,
    pub text: String,
}

#[derive(Debug)]
struct BufferState {
    entries: VecDeque<LogEntry>,
    /// Set by the first pull of a drain session, cleared when it ends
    session_boundary: Option<Instant>,
}

/// Thread-safe FIFO of timestamped log lines
#[derive(Debug, Clone)]
pub struct LogBuffer {
    inner: Arc<Mutex<BufferState>>,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    /// Create a buffer with room for `capacity` entries before it first grows
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BufferState {
                entries: VecDeque::with_capacity(capacity.max(1)),
                session_boundary: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        // A panicking producer must not silence everyone else
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a line at the tail
    pub fn append(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.lock();

        let mut timestamp = Instant::now();
        // Keep the sequence non-decreasing and strictly after an open boundary
        if let Some(last) = state.entries.back() {
            timestamp = timestamp.max(last.timestamp);
        }
        if let Some(boundary) = state.session_boundary {
            if timestamp <= boundary {
                timestamp = boundary + Duration::from_nanos(1);
            }
        }

        // Grow by doubling
        let capacity = state.entries.capacity();
        if state.entries.len() == capacity {
            state.entries.reserve_exact(capacity.max(1));
        }

        state.entries.push_back(LogEntry { timestamp, text });
    }

    /// Pull the next line of the current drain session
    ///
    /// Returns an empty string once the session has delivered every entry that
    /// existed when it opened; the following pull opens a new session.
    pub fn pull_one(&self) -> String {
        let mut state = self.lock();

        let boundary = match state.session_boundary {
            Some(boundary) => boundary,
            None => {
                // Everything buffered right now belongs to the new session
                let mut boundary = Instant::now();
                if let Some(last) = state.entries.back() {
                    boundary = boundary.max(last.timestamp);
                }
                state.session_boundary = Some(boundary);
                boundary
            }
        };

        let head_in_session = state
            .entries
            .front()
            .is_some_and(|entry| entry.timestamp <= boundary);

        if head_in_session {
            if let Some(entry) = state.entries.pop_front() {
                return entry.text;
            }
        }

        state.session_boundary = None;
        String::new()
    }

    /// Number of buffered entries
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether a drain session is currently open
    #[cfg(test)]
    pub fn in_session(&self) -> bool {
        self.lock().session_boundary.is_some()
    }

    /// Current entry capacity
    pub fn capacity(&self) -> usize {
        self.lock().entries.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_drain_in_order_then_sentinel() {
        let buffer = LogBuffer::default();
        for i in 0..5 {
            buffer.append(format!("line {}", i));
        }

        for i in 0..5 {
            assert_eq!(buffer.pull_one(), format!("line {}", i));
        }
        assert_eq!(buffer.pull_one(), "");
        assert_eq!(buffer.len(), 0);
        assert!(!buffer.in_session());
    }

    #[test]
    fn test_pull_on_empty_returns_immediately() {
        let buffer = LogBuffer::default();
        assert_eq!(buffer.pull_one(), "");
        assert_eq!(buffer.pull_one(), "");
        assert!(!buffer.in_session());
    }

    #[test]
    fn test_snapshot_window_excludes_later_appends() {
        let buffer = LogBuffer::default();
        buffer.append("A");

        // Opens the session and returns A
        assert_eq!(buffer.pull_one(), "A");
        assert!(buffer.in_session());

        buffer.append("B");

        // B arrived after the boundary: end of batch despite a non-empty buffer
        assert_eq!(buffer.pull_one(), "");
        assert_eq!(buffer.len(), 1);

        // Fresh session picks B up
        assert_eq!(buffer.pull_one(), "B");
        assert_eq!(buffer.pull_one(), "");
    }

    #[test]
    fn test_snapshot_window_with_boundary_opened_on_empty_buffer() {
        let buffer = LogBuffer::default();
        buffer.append("A");
        assert_eq!(buffer.pull_one(), "A");
        assert_eq!(buffer.pull_one(), "");

        buffer.append("B");
        buffer.append("C");
        assert_eq!(buffer.pull_one(), "B");
        buffer.append("D");
        assert_eq!(buffer.pull_one(), "C");
        assert_eq!(buffer.pull_one(), "");
        assert_eq!(buffer.pull_one(), "D");
    }

    #[test]
    fn test_capacity_doubles() {
        let buffer = LogBuffer::with_capacity(4);
        let initial = buffer.capacity();
        for i in 0..initial {
            buffer.append(i.to_string());
        }
        assert_eq!(buffer.capacity(), initial);

        buffer.append("overflow");
        assert!(buffer.capacity() >= initial * 2);
        assert_eq!(buffer.len(), initial + 1);
    }

    #[test]
    fn test_concurrent_producers_keep_per_thread_order() {
        let buffer = LogBuffer::with_capacity(8);
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let buffer = buffer.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        buffer.append(format!("{}:{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("producer panicked");
        }

        let mut drained = Vec::new();
        loop {
            let line = buffer.pull_one();
            if line.is_empty() {
                break;
            }
            drained.push(line);
        }
        assert_eq!(drained.len(), 400);

        for t in 0..4 {
            let seq: Vec<usize> = drained
                .iter()
                .filter_map(|l| l.strip_prefix(&format!("{}:", t)))
                .map(|n| n.parse().expect("numeric suffix"))
                .collect();
            assert_eq!(seq, (0..100).collect::<Vec<_>>());
        }
    }
}
