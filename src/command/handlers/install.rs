//! `msi <path>` handler

use crate::command::CommandResult;
use crate::service::ServiceContext;
use autoupdate_shared::response;
use std::path::Path;
use tracing::info;

/// Run the installer synchronously; the response waits for it to exit
pub async fn handle_install(ctx: &ServiceContext, path: &str) -> CommandResult {
    info!("MSI command, running installer {:?}", path);

    let token = if ctx.runner.run(Path::new(path)).await {
        response::OK
    } else {
        response::ERROR
    };
    CommandResult::Respond(token.to_string())
}
