//! Service lifecycle
//!
//! This module handles:
//! - The shared service context and session signal
//! - The service loop restarting the transport after each disconnect
//! - Registration with the host service manager

mod context;
pub mod registration;
mod service_loop;

pub use context::{ServiceContext, SessionSignal};
pub use registration::{Registration, RegistrationError};
pub use service_loop::{RestartPolicy, ServiceLoop};

#[cfg(test)]
pub(crate) use context::testing;
