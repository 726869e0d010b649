use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, PendingPayload};
use anyhow::Result;
use chrono::Utc;
use fct_designation::{DesignationBuilder, DesignationStore, EventWindow};
use fct_lineage::LineageResolver;
use fct_model::normalize_working_set;
use fct_protocol::{CommandAction, Hint, NextAction};
use serde_json::{json, Value};
use std::collections::BTreeSet;

pub(crate) struct PendingService;

impl PendingService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: PendingPayload = parse_payload(CommandAction::Pending, payload)?;
        let lab = ctx.lab_store()?;
        let mut cache = ctx.config().cache.batch_cache()?;
        let mut resolver = LineageResolver::new(&lab, &mut cache);

        let mut session = ctx.load_session()?;
        let persisted = session.store.load_with_status(&payload.statuses)?;
        log::info!("Reloading {} persisted designations", persisted.len());

        let settings = &ctx.config().designation;
        let now = Utc::now();
        let builder = DesignationBuilder::new(
            settings.loading_events.clone(),
            EventWindow::trailing_days(now, settings.window_days)?,
        )
        .at(now);
        let rebuilt = builder.rebuild_from_persisted(persisted, &mut resolver)?;

        let reloaded: BTreeSet<_> = rebuilt.records.iter().filter_map(|r| r.id).collect();
        session
            .records
            .retain(|r| r.id.map_or(true, |id| !reloaded.contains(&id)));
        session.records.extend(rebuilt.records.iter().cloned());
        normalize_working_set(&mut session.records);
        ctx.save_session(&session)?;

        let mut result = CommandOutcome::from_value(json!({
            "records": rebuilt.records,
            "warnings": rebuilt.warnings,
            "ambiguous": rebuilt.ambiguous,
            "working_set": session.records.len(),
        }))?;
        result.meta = ctx.base_meta();
        result.meta.session_updated = Some(true);
        result
            .hints
            .extend(rebuilt.warnings.iter().map(|w| Hint::warn(w.clone())));
        if !rebuilt.ambiguous.is_empty() {
            let barcodes: Vec<&str> = rebuilt
                .ambiguous
                .iter()
                .map(|a| a.barcode.as_str())
                .collect();
            result.next_actions.push(NextAction {
                action: CommandAction::Resolve,
                args: json!({ "input": barcodes.join(" ") }),
                reason: "These tubes need an LCSET choice before they can be allocated."
                    .to_string(),
            });
        } else if !rebuilt.records.is_empty() {
            result.next_actions.push(NextAction {
                action: CommandAction::Allocate,
                args: json!({}),
                reason: "Queued designations are ready for flowcells.".to_string(),
            });
        }
        Ok(result)
    }
}
