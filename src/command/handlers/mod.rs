//! Command handlers for each request type

mod install;
mod log;
mod session;
mod status;

pub use install::handle_install;
pub use log::handle_log_pull;
pub use session::handle_disconnect;
pub use status::handle_status_query;
