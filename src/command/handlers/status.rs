//! `status` handler

use crate::command::CommandResult;
use crate::service::ServiceContext;
use tracing::info;

pub async fn handle_status_query(ctx: &ServiceContext) -> CommandResult {
    let status = ctx.status.read();
    let token = status.response_token();
    info!("STATUS command, last install {} -> {}", status, token);
    CommandResult::Respond(token.to_string())
}
