//! Command handling for the service channel
//!
//! This module handles:
//! - Parsing request lines into commands
//! - Dispatching to the matching handler
//! - Producing the response token, or ending the session

mod dispatcher;
pub mod handlers;

pub use dispatcher::{CommandDispatcher, CommandResult};
