use crate::persistence::DesignationStore;
use fct_model::{
    DesignationId, DesignationRecord, DesignationStatus, EditContext, FlowcellType, IndexType,
    Priority, Transition,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sparse edit applied to every selected record. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MultiEditTemplate {
    #[serde(default)]
    pub status: Option<DesignationStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub sequencer_model: Option<FlowcellType>,
    #[serde(default)]
    pub number_lanes: Option<u32>,
    #[serde(default)]
    pub loading_conc: Option<Decimal>,
    #[serde(default)]
    pub read_length: Option<u32>,
    #[serde(default)]
    pub index_type: Option<IndexType>,
    #[serde(default)]
    pub number_cycles: Option<u32>,
    #[serde(default)]
    pub paired_end_read: Option<bool>,
    #[serde(default)]
    pub pool_test: Option<bool>,
}

impl MultiEditTemplate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    fn overwrite(&self, record: &mut DesignationRecord) {
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(model) = self.sequencer_model {
            record.sequencer_model = Some(model);
        }
        if let Some(lanes) = self.number_lanes {
            record.number_lanes = Some(lanes);
        }
        if let Some(conc) = self.loading_conc {
            record.loading_conc = Some(conc);
        }
        if let Some(read_length) = self.read_length {
            record.read_length = Some(read_length);
        }
        if let Some(index_type) = self.index_type {
            record.index_type = Some(index_type);
        }
        if let Some(cycles) = self.number_cycles {
            record.number_cycles = Some(cycles);
        }
        if let Some(paired) = self.paired_end_read {
            record.paired_end_read = Some(paired);
        }
        if let Some(pool_test) = self.pool_test {
            record.pool_test = Some(pool_test);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PersistFailure {
    pub barcode: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MultiEditOutcome {
    pub edited: usize,
    /// Unsaved rows dropped by an abandon
    pub removed: Vec<String>,
    /// Selected rows whose status forbade the edit
    pub skipped: Vec<String>,
    pub persisted: Vec<DesignationId>,
    pub failures: Vec<PersistFailure>,
}

/// Applies `template` to the selected records, then saves the edited ones
/// whose status is in `persist`.
///
/// A record the store refuses goes back to its state before the edit and
/// stays selected.
pub fn apply_multi_edit(
    records: &mut Vec<DesignationRecord>,
    template: &MultiEditTemplate,
    ctx: EditContext,
    persist: &BTreeSet<DesignationStatus>,
    store: &mut dyn DesignationStore,
) -> MultiEditOutcome {
    let mut outcome = MultiEditOutcome::default();
    let mut edited = Vec::with_capacity(records.len());

    for mut record in records.drain(..) {
        if !record.selected {
            edited.push((record, None));
            continue;
        }
        if !record.status.is_editable_in(ctx) {
            log::debug!("Skipping {} in status {}", record.barcode, record.status);
            outcome.skipped.push(record.barcode.clone());
            edited.push((record, None));
            continue;
        }
        let before = record.clone();
        if let Some(target) = template.status {
            match record.status.transition(target, ctx) {
                Transition::Set(status) => record.status = status,
                Transition::Remove => {
                    log::debug!("Removing unsaved {}", record.barcode);
                    outcome.removed.push(record.barcode);
                    continue;
                }
                Transition::Forbidden => {
                    log::debug!(
                        "Skipping {}: {} -> {target} not allowed",
                        record.barcode,
                        record.status
                    );
                    outcome.skipped.push(record.barcode.clone());
                    edited.push((record, None));
                    continue;
                }
            }
        }
        template.overwrite(&mut record);
        outcome.edited += 1;
        edited.push((record, Some(before)));
    }

    for (mut record, before) in edited {
        if let Some(before) = before.filter(|_| persist.contains(&record.status)) {
            match store.save(&record) {
                Ok(id) => {
                    record.id = Some(id);
                    record.selected = false;
                    outcome.persisted.push(id);
                }
                Err(err) => {
                    log::warn!("Could not save {}: {err}", record.barcode);
                    outcome.failures.push(PersistFailure {
                        barcode: record.barcode.clone(),
                        message: err.to_string(),
                    });
                    record = before;
                }
            }
        }
        records.push(record);
    }
    outcome
}
