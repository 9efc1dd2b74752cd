//! Empty request handler

use crate::command::CommandResult;
use crate::service::SessionSignal;
use tracing::info;

/// Clear the connected flag so the service loop restarts the transport
pub async fn handle_disconnect(session: &SessionSignal) -> CommandResult {
    info!("Empty request, disconnection requested");
    session.disconnect();
    CommandResult::EndSession
}
