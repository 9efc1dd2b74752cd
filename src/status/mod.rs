//! Install status persistence and start-up reconciliation

mod store;

pub use store::{StatusError, StatusStore};
