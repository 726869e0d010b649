use super::resolve::{link_input, Linked};
use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, BuildPayload, CommandOutcome};
use anyhow::Result;
use chrono::Utc;
use fct_designation::{DesignationBuilder, EventWindow};
use fct_lineage::AmbiguousAssignment;
use fct_model::{normalize_working_set, DesignationRecord};
use fct_protocol::{CommandAction, Hint, NextAction};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Serialize)]
struct BuildOutput {
    records: Vec<DesignationRecord>,
    warnings: Vec<String>,
    ambiguous: Vec<AmbiguousAssignment>,
    working_set: usize,
}

pub(crate) struct BuildService;

impl BuildService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: BuildPayload = parse_payload(CommandAction::Build, payload)?;
        let lab = ctx.lab_store()?;
        let mut cache = ctx.config().cache.batch_cache()?;
        let (linked, mut resolver) = link_input(
            &lab,
            &mut cache,
            &payload.input,
            payload.event_kind,
            &payload.choices,
        )?;
        let Linked {
            mut outcome,
            errors,
        } = linked;
        resolver.apply_choices(&mut outcome)?;

        let settings = &ctx.config().designation;
        let now = payload.now.unwrap_or_else(Utc::now);
        let builder = DesignationBuilder::new(
            settings.loading_events.clone(),
            EventWindow::trailing_days(now, settings.window_days)?,
        )
        .at(now);
        let built = builder.build_designations(&outcome.assignments);

        let mut warnings: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        warnings.extend(outcome.messages);
        warnings.extend(built.warnings);

        let mut session = ctx.load_session()?;
        session.records.extend(built.records.iter().cloned());
        normalize_working_set(&mut session.records);
        ctx.save_session(&session)?;

        let output = BuildOutput {
            records: built.records,
            warnings,
            ambiguous: built.ambiguous,
            working_set: session.records.len(),
        };

        let mut result = CommandOutcome::from_value(&output)?;
        result.meta = ctx.base_meta();
        result.meta.session_updated = Some(true);
        result
            .hints
            .extend(output.warnings.iter().map(|w| Hint::warn(w.clone())));
        if !output.records.is_empty() {
            let barcodes: Vec<&str> = output.records.iter().map(|r| r.barcode.as_str()).collect();
            result.next_actions.push(NextAction {
                action: CommandAction::Edit,
                args: json!({
                    "barcodes": barcodes,
                    "template": { "status": "QUEUED" },
                }),
                reason: "Set sequencer model and lanes, then queue the new designations."
                    .to_string(),
            });
        }
        Ok(result)
    }
}
