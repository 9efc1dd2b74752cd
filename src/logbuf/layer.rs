//! Tracing integration
//!
//! Every event that passes the global filter is formatted as one line and
//! appended to the [`LogBuffer`], alongside the regular `fmt` output.

use super::LogBuffer;
use anyhow::{Context as _, Result};
use std::fmt::{self, Write as _};
use std::path::Path;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::Context;
use tracing_subscriber::{fmt as sub_fmt, prelude::*, EnvFilter, Layer};

/// Where the `fmt` output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Foreground test mode
    Stdout,
    /// Managed mode: a per-start file in the data directory
    File,
}

/// Layer that copies formatted events into a [`LogBuffer`]
pub struct BufferLayer {
    buffer: LogBuffer,
}

impl BufferLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl<S: Subscriber> Layer<S> for BufferLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let line = format!(
            "{} | {} | {} | {}{}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"),
            metadata.level(),
            metadata.target(),
            visitor.message,
            visitor.fields
        );
        // Formatting happens outside the buffer lock
        self.buffer.append(line);
    }
}

/// Collects the message and any extra fields of an event
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Install the global subscriber: env filter, `fmt` output and the buffer layer
///
/// The returned guard flushes file output on drop and must be held for the
/// life of the process.
pub fn init_tracing(
    buffer: LogBuffer,
    output: LogOutput,
    default_filter: &str,
    log_dir: &Path,
) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .with_context(|| format!("invalid log filter {:?}", default_filter))?;

    let (fmt_layer, guard) = match output {
        LogOutput::Stdout => (sub_fmt::layer().boxed(), None),
        LogOutput::File => {
            std::fs::create_dir_all(log_dir)
                .with_context(|| format!("creating log directory {:?}", log_dir))?;
            let file_name = format!("autoupdate_{}.log", chrono::Utc::now().timestamp());
            let appender = tracing_appender::rolling::never(log_dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                sub_fmt::layer().with_writer(writer).with_ansi(false).boxed(),
                Some(guard),
            )
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(BufferLayer::new(buffer))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
