//! `log` handler

use crate::command::CommandResult;
use crate::service::ServiceContext;
use tracing::debug;

/// Next line of the current drain session, or the empty end-of-batch sentinel
pub async fn handle_log_pull(ctx: &ServiceContext) -> CommandResult {
    debug!("LOG command, returning next log line");
    CommandResult::Respond(ctx.log_buffer.pull_one())
}
