mod allocate;
mod build;
mod capabilities;
mod edit;
mod pending;
mod resolve;

use crate::command::context::CommandContext;
use crate::command::domain::CommandOutcome;
use anyhow::Result;
use fct_protocol::CommandAction;
use serde_json::Value;

pub struct Services {
    allocate: allocate::AllocateService,
    build: build::BuildService,
    capabilities: capabilities::CapabilitiesService,
    edit: edit::EditService,
    pending: pending::PendingService,
    resolve: resolve::ResolveService,
}

impl Services {
    pub fn new() -> Self {
        Self {
            allocate: allocate::AllocateService,
            build: build::BuildService,
            capabilities: capabilities::CapabilitiesService,
            edit: edit::EditService,
            pending: pending::PendingService,
            resolve: resolve::ResolveService,
        }
    }

    pub fn route(
        &self,
        action: CommandAction,
        payload: Value,
        ctx: &CommandContext,
    ) -> Result<CommandOutcome> {
        match action {
            CommandAction::Resolve => self.resolve.run(payload, ctx),
            CommandAction::Build => self.build.run(payload, ctx),
            CommandAction::Edit => self.edit.run(payload, ctx),
            CommandAction::Allocate => self.allocate.run(payload, ctx),
            CommandAction::Pending => self.pending.run(payload, ctx),
            CommandAction::Capabilities => self.capabilities.run(payload, ctx),
        }
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new()
    }
}
