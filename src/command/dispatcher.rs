//! Command dispatcher - parses request lines and routes them to handlers

use super::handlers;
use crate::service::{ServiceContext, SessionSignal};
use crate::transport::RequestHandler;
use async_trait::async_trait;
use autoupdate_shared::{response, Request};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of handling one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Send this line back to the client
    Respond(String),
    /// No response; the session is over
    EndSession,
}

/// Routes requests of one transport session
pub struct CommandDispatcher {
    ctx: Arc<ServiceContext>,
    session: Arc<SessionSignal>,
}

impl CommandDispatcher {
    pub fn new(ctx: Arc<ServiceContext>, session: Arc<SessionSignal>) -> Self {
        Self { ctx, session }
    }

    /// Handle one request; `None` is an absent request
    pub async fn dispatch(&self, line: Option<&str>) -> CommandResult {
        let request = Request::parse(line);
        match &request {
            Request::NextLogLine => debug!("Request received: {}", request),
            _ => info!("Request received: {}", request),
        }

        match request {
            Request::Disconnect => handlers::handle_disconnect(&self.session).await,
            Request::RunInstaller(path) => handlers::handle_install(&self.ctx, &path).await,
            Request::QueryStatus => handlers::handle_status_query(&self.ctx).await,
            Request::NextLogLine => handlers::handle_log_pull(&self.ctx).await,
            Request::Unknown(raw) => {
                info!("Unknown command {:?}, ignored", raw);
                CommandResult::Respond(response::ERROR.to_string())
            }
        }
    }
}

#[async_trait]
impl RequestHandler for CommandDispatcher {
    async fn handle(&self, request: Option<&str>) -> Option<String> {
        match self.dispatch(request).await {
            CommandResult::Respond(line) => Some(line),
            CommandResult::EndSession => None,
        }
    }
}
