//! Installer execution
//!
//! [`InstallerRunner`] gates on the trust validator, records status around
//! the launch and merges the installer's verbose log afterwards. Process
//! handling sits behind [`ProcessLauncher`].

mod launcher;
mod msi_log;
mod runner;

pub use launcher::{InstallerProcess, Invocation, ProcessLauncher, TokioLauncher};
pub use runner::InstallerRunner;

#[cfg(test)]
pub(crate) use runner::spies;
