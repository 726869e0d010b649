use crate::aggregate::LoadingTubeAggregate;
use crate::error::Result;
use crate::window::EventWindow;
use chrono::{DateTime, Utc};
use fct_lineage::{
    candidate_batches, merge_ambiguous, unknown_lcset_message, AmbiguousAssignment,
    LineageResolver, TubeAssignment,
};
use fct_model::{
    DesignationRecord, IndexType, LabEventType, RegulatoryDesignation, Vessel, CONTROLS,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildOutcome {
    pub records: Vec<DesignationRecord>,
    pub warnings: Vec<String>,

    /// Persisted designations whose tube now points at several batches
    pub ambiguous: Vec<AmbiguousAssignment>,
}

/// Turns resolved loading tubes into designation records.
#[derive(Debug, Clone)]
pub struct DesignationBuilder {
    loading_events: Vec<LabEventType>,
    window: EventWindow,
    now: DateTime<Utc>,
}

impl DesignationBuilder {
    pub fn new(loading_events: Vec<LabEventType>, window: EventWindow) -> Self {
        Self {
            loading_events,
            window,
            now: Utc::now(),
        }
    }

    /// Fixes the creation time given to new records.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn window(&self) -> &EventWindow {
        &self.window
    }

    /// One new `UNSAVED` record per assigned tube that has a loading event in
    /// the window. Tubes without one are dropped with a warning.
    pub fn build_designations(&self, assignments: &[TubeAssignment]) -> BuildOutcome {
        let mut outcome = BuildOutcome::default();
        for assignment in assignments {
            let agg = LoadingTubeAggregate::collect(
                &assignment.vessel,
                &assignment.batch,
                &self.loading_events,
                Some(&self.window),
            );
            if agg.events.is_empty() {
                let warning = self.missing_event_warning(&agg);
                log::warn!("{warning}");
                outcome.warnings.push(warning);
                continue;
            }
            let mut record = self.make_record(&agg, None);
            if assignment.chosen {
                record.chosen_lcset = Some(assignment.batch.name.clone());
            }
            outcome.records.push(record);
        }
        outcome.records.sort_by(DesignationRecord::cmp_by_barcode_id_date);
        log::info!(
            "Built {} designations, {} tubes excluded",
            outcome.records.len(),
            outcome.warnings.len()
        );
        outcome
    }

    /// Rebuilds persisted designations against the current lineage.
    ///
    /// The batch is the tube's only candidate, or the recorded choice when it
    /// is still a candidate. Anything else is reported and left out.
    pub fn rebuild_from_persisted(
        &self,
        persisted: Vec<DesignationRecord>,
        resolver: &mut LineageResolver<'_>,
    ) -> Result<BuildOutcome> {
        let mut outcome = BuildOutcome::default();
        for existing in persisted {
            let Some(vessel) = resolver.store().find_vessel(&existing.barcode)? else {
                outcome.warnings.push(format!(
                    "Tube {} of designation {} no longer exists",
                    existing.barcode,
                    existing.id.map_or_else(|| "none".to_string(), |id| id.to_string())
                ));
                continue;
            };

            let candidates = candidate_batches(&vessel, None);
            let lcset = if candidates.len() == 1 {
                candidates.first().cloned()
            } else {
                existing
                    .chosen_lcset
                    .clone()
                    .filter(|chosen| candidates.contains(chosen))
            };

            match lcset {
                Some(name) => {
                    let batch = resolver.batch(&name)?;
                    let agg = LoadingTubeAggregate::collect(
                        &vessel,
                        &batch,
                        &self.loading_events,
                        None,
                    );
                    outcome.records.push(self.make_record(&agg, Some(&existing)));
                }
                None => {
                    if candidates.len() > 1 {
                        let mut amb = ambiguous_for(&vessel, &candidates, resolver)?;
                        amb.designation_id = existing.id;
                        merge_ambiguous(&mut outcome.ambiguous, amb);
                    }
                    let warning = unknown_lcset_message(existing.id, &existing.barcode);
                    log::warn!("{warning}");
                    outcome.warnings.push(warning);
                }
            }
        }
        outcome.records.sort_by(DesignationRecord::cmp_by_barcode_id_date);
        Ok(outcome)
    }

    fn make_record(
        &self,
        agg: &LoadingTubeAggregate,
        existing: Option<&DesignationRecord>,
    ) -> DesignationRecord {
        let mut record = match existing {
            Some(existing) => existing.clone(),
            None => DesignationRecord::new(&agg.vessel.barcode, &agg.batch.name, self.now),
        };
        record.barcode = agg.vessel.barcode.clone();
        record.lcset = agg.batch.name.clone();
        record.lcset_url = agg.batch.ticket_url.clone();
        record.additional_lcsets = agg.additional_batches.iter().cloned().collect();

        let dates: BTreeSet<DateTime<Utc>> = agg.events.iter().map(|e| e.event_date).collect();
        record.tube_dates = dates.into_iter().collect();
        if let Some(latest) = agg.latest_event() {
            record.tube_type = Some(latest.event_type.tube_type().to_string());
            record.tube_event_id = Some(latest.id);
        }

        let mut by_product: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut regulatory = None;
        let mut samples = 0;
        for entry in &agg.bucket_entries {
            let order = &entry.product_order;
            if let Some(product) = &order.product {
                // Product values are defaults only; a stored choice wins.
                if record.read_length.is_none() {
                    record.read_length = product.read_length;
                }
                if record.paired_end_read.is_none() {
                    record.paired_end_read = product.paired_end_read;
                }
                if record.loading_conc.is_none() {
                    record.loading_conc = product.loading_concentration;
                }
                if record.index_type.is_none() {
                    record.index_type = Some(product.index_type.unwrap_or(IndexType::Dual));
                }
            }
            if record.index_type.is_none() {
                record.index_type = Some(IndexType::None);
            }
            by_product
                .entry(order.product_label())
                .or_default()
                .insert(entry.vessel.barcode.clone());
            regulatory = Some(RegulatoryDesignation::combine(regulatory, order.clinical));
            samples += entry.vessel.sample_count;
        }
        for control in &agg.controls {
            by_product
                .entry(CONTROLS.to_string())
                .or_default()
                .insert(control.barcode.clone());
            samples += control.sample_count;
        }

        record.regulatory_designation = regulatory;
        record.number_samples = samples;
        record.starting_batch_vessels = by_product
            .iter()
            .map(|(product, vessels)| {
                let vessels = vessels.iter().cloned().collect::<Vec<_>>().join(", ");
                if product == CONTROLS {
                    format!("{CONTROLS}: {vessels}")
                } else {
                    format!("Bucketed tubes for {product}: {vessels}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        record.product_names = by_product.into_keys().collect();

        if record.number_cycles.is_none() {
            record.number_cycles = record.calculate_cycles();
        }
        record
    }

    fn missing_event_warning(&self, agg: &LoadingTubeAggregate) -> String {
        let kinds = self
            .loading_events
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join("/");
        if agg.excluded_events > 0 {
            format!(
                "Excluded {}: its {kinds} events are outside {} to {}",
                agg.vessel.barcode,
                self.window.start.format("%Y-%m-%d"),
                self.window.end.format("%Y-%m-%d"),
            )
        } else {
            format!("Excluded {}: no {kinds} event", agg.vessel.barcode)
        }
    }
}

fn ambiguous_for(
    vessel: &Vessel,
    candidates: &BTreeSet<String>,
    resolver: &mut LineageResolver<'_>,
) -> Result<AmbiguousAssignment> {
    let mut batches = Vec::with_capacity(candidates.len());
    for name in candidates {
        batches.push(resolver.batch(name)?);
    }
    Ok(AmbiguousAssignment::new(vessel, batches))
}
