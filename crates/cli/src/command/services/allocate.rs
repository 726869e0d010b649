use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, AllocatePayload, CommandOutcome};
use anyhow::Result;
use fct_allocation::AllocationEngine;
use fct_protocol::{CommandAction, Hint, NextAction};
use serde_json::{json, Value};

pub(crate) struct AllocateService;

impl AllocateService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: AllocatePayload = parse_payload(CommandAction::Allocate, payload)?;
        let mut config = ctx.config().allocation.engine_config()?;
        if let Some(partial) = payload.partial_flowcells {
            config.partial_flowcells = partial;
        }

        let mut session = ctx.load_session()?;
        let records = std::mem::take(&mut session.records);
        let outcome = {
            let mut engine =
                AllocationEngine::new(config, &mut session.ticketing, &mut session.store)?;
            engine.allocate_to_flowcells(records)
        };
        session.records = outcome.records.clone();
        ctx.save_session(&session)?;

        let allocated = outcome.allocated_lanes();
        let mut result = CommandOutcome::from_value(json!({
            "batches": outcome.batches,
            "failures": outcome.failures,
            "warnings": outcome.warnings,
            "allocated_lanes": allocated,
            "records": outcome.records,
        }))?;
        result.meta = ctx.base_meta();
        result.meta.session_updated = Some(true);
        result
            .hints
            .extend(outcome.warnings.iter().map(|w| Hint::warn(w.clone())));
        for failure in &outcome.failures {
            result.hints.push(Hint::warn(format!(
                "{} lanes for {} stay queued: {}",
                failure.lanes,
                failure.barcodes.join(", "),
                failure.message
            )));
        }
        if !outcome.failures.is_empty() {
            result.next_actions.push(NextAction {
                action: CommandAction::Pending,
                args: json!({}),
                reason: "Reload what is still queued before retrying.".to_string(),
            });
        }
        Ok(result)
    }
}
