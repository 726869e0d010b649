mod context;
pub mod domain;
mod services;

pub use context::CommandContext;
pub use domain::{classify_error, CommandOutcome};

use fct_protocol::{
    CommandAction, CommandRequest, CommandResponse, CommandStatus, ErrorEnvelope, ResponseMeta,
};
use serde_json::Value;
use services::Services;
use std::time::Instant;

pub struct CommandHandler {
    services: Services,
    ctx: CommandContext,
}

impl CommandHandler {
    pub fn new(ctx: CommandContext) -> Self {
        Self {
            services: Services::new(),
            ctx,
        }
    }

    /// Runs one request. Failures come back as an error envelope, never as `Err`.
    pub fn execute(&self, request: CommandRequest) -> CommandResponse {
        let started = Instant::now();
        let CommandRequest {
            action,
            payload,
            options,
        } = request;
        let payload_for_meta = payload.clone();
        let ctx = self.ctx.clone().with_options(options);
        log::debug!("Executing {}", action.as_str());

        match self.services.route(action, payload, &ctx) {
            Ok(mut outcome) => {
                outcome.meta.duration_ms = Some(started.elapsed().as_millis() as u64);
                CommandResponse {
                    status: CommandStatus::Ok,
                    message: None,
                    error: None,
                    hints: outcome.hints,
                    next_actions: outcome.next_actions,
                    data: outcome.data,
                    meta: outcome.meta,
                }
            }
            Err(err) => {
                let mut meta = ctx.base_meta();
                meta.duration_ms = Some(started.elapsed().as_millis() as u64);
                error_response(&err, Some(action), Some(&payload_for_meta), meta)
            }
        }
    }
}

pub fn error_response(
    err: &anyhow::Error,
    action: Option<CommandAction>,
    payload: Option<&Value>,
    meta: ResponseMeta,
) -> CommandResponse {
    let message = format!("{err:#}");
    log::warn!("{message}");
    let classification = classify_error(&message, action, payload);
    let error = ErrorEnvelope {
        code: classification.code,
        message: message.clone(),
        details: None,
        hint: classification.hint,
        next_actions: classification.next_actions.clone(),
    };
    CommandResponse {
        status: CommandStatus::Error,
        message: Some(message),
        error: Some(error),
        hints: classification.hints,
        next_actions: classification.next_actions,
        data: Value::Null,
        meta,
    }
}

pub fn execute(request: CommandRequest, ctx: CommandContext) -> CommandResponse {
    CommandHandler::new(ctx).execute(request)
}
