use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, EditPayload};
use anyhow::Result;
use fct_designation::{apply_multi_edit, MultiEditOutcome};
use fct_model::{normalize_working_set, DesignationRecord, DesignationStatus};
use fct_protocol::{CommandAction, Hint, NextAction};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct EditOutput {
    outcome: MultiEditOutcome,
    records: Vec<DesignationRecord>,
}

pub(crate) struct EditService;

impl EditService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: EditPayload = parse_payload(CommandAction::Edit, payload)?;
        if payload.template.is_empty() {
            anyhow::bail!("Edit template is empty");
        }
        if payload.barcodes.is_empty() && !payload.all {
            anyhow::bail!("Rows not specified; pass barcodes or all=true");
        }

        let mut session = ctx.load_session()?;
        for barcode in &payload.barcodes {
            if !session.records.iter().any(|r| &r.barcode == barcode) {
                anyhow::bail!("No designation for tube {barcode} in the working set");
            }
        }
        for record in &mut session.records {
            record.selected = payload.all || payload.barcodes.contains(&record.barcode);
        }

        let persist = payload
            .persist
            .clone()
            .unwrap_or_else(DesignationStatus::persist_eligible);
        let outcome = apply_multi_edit(
            &mut session.records,
            &payload.template,
            payload.context,
            &persist,
            &mut session.store,
        );
        normalize_working_set(&mut session.records);
        ctx.save_session(&session)?;

        let queued = session
            .records
            .iter()
            .filter(|r| r.status == DesignationStatus::Queued)
            .count();
        let output = EditOutput {
            outcome,
            records: session.records,
        };

        let mut result = CommandOutcome::from_value(&output)?;
        result.meta = ctx.base_meta();
        result.meta.session_updated = Some(true);
        if !output.outcome.skipped.is_empty() {
            result.hints.push(Hint::warn(format!(
                "Not editable here: {}",
                output.outcome.skipped.join(", ")
            )));
        }
        for failure in &output.outcome.failures {
            result
                .hints
                .push(Hint::warn(format!("{}: {}", failure.barcode, failure.message)));
        }
        if queued > 0 {
            result.next_actions.push(NextAction {
                action: CommandAction::Allocate,
                args: json!({}),
                reason: format!("{queued} designation(s) are queued for flowcells."),
            });
        }
        Ok(result)
    }
}
