use crate::command::context::CommandContext;
use crate::command::domain::{parse_payload, CommandOutcome, ResolvePayload};
use anyhow::Result;
use fct_lineage::{
    AmbiguousAssignment, BatchCache, InMemoryLabStore, LineageResolver, LinkOutcome, TokenError,
};
use fct_model::LabEventType;
use fct_protocol::{CommandAction, Hint, NextAction};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Parsed and linked input, before any choice is turned into an assignment.
pub(crate) struct Linked {
    pub outcome: LinkOutcome,
    pub errors: Vec<TokenError>,
}

pub(crate) fn link_input<'a>(
    lab: &'a InMemoryLabStore,
    cache: &'a mut BatchCache,
    input: &str,
    kind: LabEventType,
    choices: &BTreeMap<String, String>,
) -> Result<(Linked, LineageResolver<'a>)> {
    let mut resolver = LineageResolver::new(lab, cache);
    let parsed = resolver.parse_tokens(input)?;
    let mut outcome = resolver.link(&parsed, kind)?;
    for (barcode, lcset) in choices {
        if !outcome.choose(barcode, lcset) {
            anyhow::bail!("{lcset} is not a candidate LCSET for tube {barcode}");
        }
    }
    Ok((
        Linked {
            outcome,
            errors: parsed.errors,
        },
        resolver,
    ))
}

#[derive(Debug, Serialize)]
struct AssignmentView {
    barcode: String,
    lcset: String,
    lcset_url: String,
    chosen: bool,
}

#[derive(Debug, Serialize)]
struct ResolveOutput {
    assignments: Vec<AssignmentView>,
    ambiguous: Vec<AmbiguousAssignment>,
    messages: Vec<String>,
    errors: Vec<TokenError>,
}

pub(crate) struct ResolveService;

impl ResolveService {
    pub fn run(&self, payload: Value, ctx: &CommandContext) -> Result<CommandOutcome> {
        let payload: ResolvePayload = parse_payload(CommandAction::Resolve, payload)?;
        let lab = ctx.lab_store()?;
        let mut cache = ctx.config().cache.batch_cache()?;
        let (linked, _) = link_input(
            &lab,
            &mut cache,
            &payload.input,
            payload.event_kind,
            &payload.choices,
        )?;

        let Linked { outcome, errors } = linked;
        let unresolved = outcome
            .ambiguous
            .iter()
            .filter(|a| a.selected_lcset.is_none())
            .count();
        let output = ResolveOutput {
            assignments: outcome
                .assignments
                .iter()
                .map(|a| AssignmentView {
                    barcode: a.vessel.barcode.clone(),
                    lcset: a.batch.name.clone(),
                    lcset_url: a.batch.ticket_url.clone(),
                    chosen: a.chosen,
                })
                .collect(),
            ambiguous: outcome.ambiguous,
            messages: outcome.messages,
            errors,
        };
        let linked_tubes = output.assignments.len() + output.ambiguous.len() - unresolved;

        let mut result = CommandOutcome::from_value(&output)?;
        result.meta = ctx.base_meta();
        if unresolved > 0 {
            result.hints.push(Hint::action(format!(
                "{unresolved} tube(s) have several candidate LCSETs; pick one per tube in payload.choices"
            )));
        }
        for error in &output.errors {
            result.hints.push(Hint::warn(error.message.clone()));
        }
        if linked_tubes > 0 {
            result.next_actions.push(NextAction {
                action: CommandAction::Build,
                args: json!({
                    "input": payload.input,
                    "event_kind": payload.event_kind,
                    "choices": payload.choices,
                }),
                reason: "Build designations for the linked tubes.".to_string(),
            });
        }
        Ok(result)
    }
}
