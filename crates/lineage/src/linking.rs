use crate::error::Result;
use crate::resolver::{AmbiguousAssignment, LineageResolution, LineageResolver};
use crate::tokens::ParsedTokens;
use fct_model::{Batch, DesignationId, LabEventType, Vessel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A loading tube with the one batch its designation will be built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeAssignment {
    pub vessel: Vessel,
    pub batch: Batch,

    /// The batch was picked by the user out of several candidates
    #[serde(default)]
    pub chosen: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub assignments: Vec<TubeAssignment>,
    pub ambiguous: Vec<AmbiguousAssignment>,
    pub messages: Vec<String>,
}

impl LinkOutcome {
    pub fn assignment(&self, barcode: &str) -> Option<&TubeAssignment> {
        self.assignments.iter().find(|a| a.vessel.barcode == barcode)
    }

    /// Records `batch` for the vessel, replacing any earlier link for the same barcode.
    pub fn assign(&mut self, vessel: Vessel, batch: Batch, chosen: bool) {
        self.ambiguous.retain(|a| a.barcode != vessel.barcode);
        match self
            .assignments
            .iter_mut()
            .find(|a| a.vessel.barcode == vessel.barcode)
        {
            Some(existing) => {
                existing.vessel = vessel;
                existing.batch = batch;
                existing.chosen = chosen;
            }
            None => self.assignments.push(TubeAssignment {
                vessel,
                batch,
                chosen,
            }),
        }
    }

    /// Batch assignment map handed to the designation builder.
    pub fn batch_by_barcode(&self) -> BTreeMap<&str, &Batch> {
        self.assignments
            .iter()
            .map(|a| (a.vessel.barcode.as_str(), &a.batch))
            .collect()
    }

    /// Records the user's pick for an ambiguous tube; false when the pick is not a candidate.
    pub fn choose(&mut self, barcode: &str, lcset: &str) -> bool {
        self.ambiguous
            .iter_mut()
            .find(|a| a.barcode == barcode)
            .is_some_and(|a| a.select(lcset))
    }
}

impl AmbiguousAssignment {
    pub fn select(&mut self, lcset: &str) -> bool {
        if self.candidates.iter().any(|b| b.name == lcset) {
            self.selected_lcset = Some(lcset.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected_batch(&self) -> Option<&Batch> {
        let name = self.selected_lcset.as_deref()?;
        self.candidates.iter().find(|b| b.name == name)
    }
}

/// Message for a tube whose batch was never settled.
pub fn unknown_lcset_message(designation_id: Option<DesignationId>, barcode: &str) -> String {
    let id = designation_id.map_or_else(|| "none".to_string(), |id| id.to_string());
    format!("Designation (id {id}) for tube {barcode} has unknown LCSET.")
}

/// Adds an ambiguous tube, or merges its candidates into the entry already
/// present for the same barcode.
pub fn merge_ambiguous(list: &mut Vec<AmbiguousAssignment>, incoming: AmbiguousAssignment) {
    match list.iter_mut().find(|a| a.barcode == incoming.barcode) {
        Some(existing) => {
            for batch in incoming.candidates {
                if !existing.candidates.iter().any(|b| b.name == batch.name) {
                    existing.candidates.push(batch);
                }
            }
            existing.candidates.sort_by(|a, b| a.name.cmp(&b.name));
            if existing.designation_id.is_none() {
                existing.designation_id = incoming.designation_id;
            }
        }
        None => list.push(incoming),
    }
}

/// Orders ambiguous tubes by barcode, then by their first candidate.
pub fn sort_ambiguous(list: &mut [AmbiguousAssignment]) {
    for entry in list.iter_mut() {
        entry.candidates.sort_by(|a, b| a.name.cmp(&b.name));
    }
    list.sort_by(|a, b| {
        a.barcode.cmp(&b.barcode).then_with(|| {
            let first = |x: &AmbiguousAssignment| x.candidates.first().map(|c| c.name.clone());
            first(a).cmp(&first(b))
        })
    });
}

impl LineageResolver<'_> {
    /// Links parsed tubes and batches to single batches.
    ///
    /// Tubes named directly resolve against their whole lineage. Batches
    /// expand to their `kind` loading tubes, each resolved with the batch
    /// as filter.
    pub fn link(&mut self, parsed: &ParsedTokens, kind: LabEventType) -> Result<LinkOutcome> {
        let mut outcome = self.link_tubes(&parsed.tubes)?;
        self.link_batches(&parsed.batches, kind, &mut outcome)?;
        sort_ambiguous(&mut outcome.ambiguous);
        Ok(outcome)
    }

    pub fn link_tubes(&mut self, tubes: &[Vessel]) -> Result<LinkOutcome> {
        let mut outcome = LinkOutcome::default();
        for tube in tubes {
            match self.resolve(tube, None)? {
                LineageResolution::Resolved(batch) => outcome.assign(tube.clone(), batch, false),
                LineageResolution::Ambiguous(amb) => merge_ambiguous(&mut outcome.ambiguous, amb),
                LineageResolution::Unassigned => outcome
                    .messages
                    .push(format!("Cannot find an LCSET for {}", tube.barcode)),
            }
        }
        sort_ambiguous(&mut outcome.ambiguous);
        Ok(outcome)
    }

    pub fn link_batches(
        &mut self,
        batches: &[Batch],
        kind: LabEventType,
        outcome: &mut LinkOutcome,
    ) -> Result<()> {
        let mut without_tubes = Vec::new();
        for target in batches {
            let filter: BTreeSet<String> = [target.name.clone()].into();
            let mut found = false;
            for tube in self.store().loading_tubes_for_batch(&target.name, kind)? {
                if outcome
                    .assignment(&tube.barcode)
                    .is_some_and(|a| a.batch.name == target.name)
                {
                    found = true;
                    continue;
                }
                if let LineageResolution::Resolved(batch) = self.resolve(&tube, Some(&filter))? {
                    found = true;
                    outcome.assign(tube, batch, false);
                }
            }
            if !found {
                without_tubes.push(target.name.clone());
            }
        }
        if !without_tubes.is_empty() {
            log::warn!("No {kind} tubes in {}", without_tubes.join(", "));
            outcome.messages.push(format!(
                "No {kind} tubes found for {}",
                without_tubes.join(", ")
            ));
        }
        Ok(())
    }

    /// Turns the user's picks into assignments. Tubes left without a pick are
    /// dropped with a message.
    pub fn apply_choices(&mut self, outcome: &mut LinkOutcome) -> Result<()> {
        let pending = std::mem::take(&mut outcome.ambiguous);
        for amb in pending {
            let Some(batch) = amb.selected_batch().cloned() else {
                outcome
                    .messages
                    .push(unknown_lcset_message(amb.designation_id, &amb.barcode));
                continue;
            };
            match self.store().find_vessel(&amb.barcode)? {
                Some(vessel) => outcome.assign(vessel, batch, true),
                None => outcome
                    .messages
                    .push(format!("Cannot find tube {}", amb.barcode)),
            }
        }
        Ok(())
    }
}
