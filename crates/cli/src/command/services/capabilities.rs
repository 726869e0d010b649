use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CapabilitiesPayload, CommandOutcome};
use anyhow::Result;
use fct_protocol::{envelope_schemas, Capabilities, CommandAction};
use serde_json::Value;

pub(crate) struct CapabilitiesService;

impl CapabilitiesService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: CapabilitiesPayload = parse_payload(CommandAction::Capabilities, payload)?;
        let capabilities = Capabilities::new("fct", env!("CARGO_PKG_VERSION"));
        let mut data = serde_json::to_value(capabilities)?;
        if payload.schemas {
            data["schemas"] = envelope_schemas();
        }

        let mut outcome = CommandOutcome::from_value(data)?;
        outcome.meta = ctx.base_meta();
        Ok(outcome)
    }
}
