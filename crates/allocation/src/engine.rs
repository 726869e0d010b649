use crate::error::{AllocationError, Result};
use crate::plan::{plan_lanes, Fragment};
use crate::ticketing::{LaneAssignment, Ticket, TicketRequest, TicketingService};
use fct_designation::DesignationStore;
use fct_model::{
    DesignationId, DesignationRecord, DesignationStatus, EditContext, FctGroupKey, FlowcellType,
    Transition,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocationConfig {
    /// Commit a trailing flowcell that is not full
    #[serde(default = "default_partial_flowcells")]
    pub partial_flowcells: bool,

    /// Lane count overrides per flowcell type
    #[serde(default)]
    pub lane_capacity: BTreeMap<FlowcellType, u32>,

    /// Largest number of flowcells one designation may fill
    #[serde(default = "default_max_flowcells_per_request")]
    pub max_flowcells_per_request: u32,
}

fn default_partial_flowcells() -> bool {
    true
}

pub const DEFAULT_MAX_FLOWCELLS_PER_REQUEST: u32 = 16;

fn default_max_flowcells_per_request() -> u32 {
    DEFAULT_MAX_FLOWCELLS_PER_REQUEST
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            partial_flowcells: default_partial_flowcells(),
            lane_capacity: BTreeMap::new(),
            max_flowcells_per_request: default_max_flowcells_per_request(),
        }
    }
}

impl AllocationConfig {
    pub fn full_flowcells_only() -> Self {
        Self {
            partial_flowcells: false,
            ..Self::default()
        }
    }

    /// Lanes per flowcell, or `None` for a model without known geometry.
    pub fn capacity_for(&self, flowcell_type: FlowcellType) -> Option<u32> {
        self.lane_capacity
            .get(&flowcell_type)
            .copied()
            .or_else(|| flowcell_type.lane_count())
    }

    /// Most lanes a single designation may request on flowcells of `capacity`.
    pub fn max_request_lanes(&self, capacity: u32) -> u64 {
        u64::from(capacity) * u64::from(self.max_flowcells_per_request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_flowcells_per_request == 0 {
            return Err(AllocationError::ZeroFlowcellLimit);
        }
        match self.lane_capacity.iter().find(|&(_, &lanes)| lanes == 0) {
            Some((&flowcell_type, _)) => Err(AllocationError::ZeroCapacity(flowcell_type)),
            None => Ok(()),
        }
    }
}

/// A committed flowcell and its tracking ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowcellBatch {
    pub ticket: Ticket,
    pub flowcell_type: FlowcellType,
    pub group: FctGroupKey,
    pub lanes: Vec<LaneAssignment>,
    pub lcsets: Vec<String>,
}

/// A planned flowcell that was not committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowcellFailure {
    pub group: FctGroupKey,
    pub barcodes: Vec<String>,
    pub lanes: u32,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AllocationOutcome {
    pub batches: Vec<FlowcellBatch>,

    /// The working set after allocation: committed fragments, carried-over
    /// remainders and every record that did not take part
    pub records: Vec<DesignationRecord>,

    pub warnings: Vec<String>,
    pub failures: Vec<FlowcellFailure>,
}

impl AllocationOutcome {
    pub fn allocated_lanes(&self) -> usize {
        self.batches.iter().map(|b| b.lanes.len()).sum()
    }
}

/// Packs queued designations into flowcells and commits them one flowcell
/// at a time.
pub struct AllocationEngine<'a> {
    config: AllocationConfig,
    tickets: &'a mut dyn TicketingService,
    store: &'a mut dyn DesignationStore,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(
        config: AllocationConfig,
        tickets: &'a mut dyn TicketingService,
        store: &'a mut dyn DesignationStore,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tickets,
            store,
        })
    }

    pub fn allocate_to_flowcells(&mut self, records: Vec<DesignationRecord>) -> AllocationOutcome {
        let mut outcome = AllocationOutcome::default();
        let mut groups: BTreeMap<FctGroupKey, Vec<DesignationRecord>> = BTreeMap::new();

        for record in records {
            let eligible = matches!(
                record
                    .status
                    .transition(DesignationStatus::InFct, EditContext::Allocation),
                Transition::Set(_)
            );
            if eligible && record.requested_lanes() > 0 {
                groups.entry(record.group_key()).or_default().push(record);
            } else {
                if eligible {
                    outcome
                        .warnings
                        .push(format!("{} is queued without lanes", record.barcode));
                }
                outcome.records.push(record);
            }
        }

        for (key, members) in groups {
            self.allocate_group(key, members, &mut outcome);
        }

        outcome
            .records
            .sort_by(DesignationRecord::cmp_by_barcode_id_date);
        log::info!(
            "Allocated {} lanes on {} flowcells, {} flowcells failed",
            outcome.allocated_lanes(),
            outcome.batches.len(),
            outcome.failures.len()
        );
        outcome
    }

    fn allocate_group(
        &mut self,
        key: FctGroupKey,
        members: Vec<DesignationRecord>,
        outcome: &mut AllocationOutcome,
    ) {
        let skip = |outcome: &mut AllocationOutcome, members: Vec<DesignationRecord>, why: String| {
            log::warn!("{why}");
            outcome.warnings.push(why);
            outcome.records.extend(members);
        };

        let Some(model) = key.sequencer_model else {
            let why = format!("Skipped {key}: no sequencer model");
            return skip(outcome, members, why);
        };
        let capacity = match self.config.capacity_for(model) {
            Some(capacity) if model.creates_fct() => capacity,
            _ => {
                let why = format!("Skipped {key}: cannot create a {model} ticket");
                return skip(outcome, members, why);
            }
        };

        let limit = self.config.max_request_lanes(capacity);
        let (oversized, mut members): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|m| u64::from(m.requested_lanes()) > limit);
        for record in oversized {
            let why = format!(
                "Skipped {}: {} lanes is more than {} flowcells of {model} can hold",
                record.barcode,
                record.requested_lanes(),
                self.config.max_flowcells_per_request
            );
            skip(outcome, vec![record], why);
        }
        if members.is_empty() {
            return;
        }

        members.sort_by(|a, b| {
            b.allocation_order()
                .cmp(&a.allocation_order())
                .then_with(|| b.requested_lanes().cmp(&a.requested_lanes()))
        });
        let requests: Vec<u32> = members.iter().map(|m| m.requested_lanes()).collect();
        let total: u64 = requests.iter().map(|&lanes| u64::from(lanes)).sum();

        if total < u64::from(capacity) && !self.config.partial_flowcells {
            let why = format!("Skipped {key}: {total} lanes cannot fill a {capacity} lane flowcell");
            return skip(outcome, members, why);
        }

        log::debug!(
            "Allocating {} designations ({total} lanes) of {key}",
            members.len()
        );
        let plan = plan_lanes(&requests, capacity, self.config.partial_flowcells);

        let mut committed: Vec<Vec<DesignationRecord>> = vec![Vec::new(); members.len()];
        let mut identity_committed = vec![false; members.len()];
        let mut uncommitted = vec![0u32; members.len()];

        for flowcell in &plan.flowcells {
            let records: Vec<DesignationRecord> = flowcell
                .fragments
                .iter()
                .map(|f| fragment_record(&members[f.origin], f))
                .collect();

            match self.commit_flowcell(model, key, &records) {
                Ok((batch, ids)) => {
                    for ((fragment, mut record), id) in
                        flowcell.fragments.iter().zip(records).zip(ids)
                    {
                        record.id = Some(id);
                        identity_committed[fragment.origin] |= fragment.carries_identity;
                        committed[fragment.origin].push(record);
                    }
                    outcome.batches.push(batch);
                }
                Err(message) => {
                    log::warn!("Flowcell not created for {key}: {message}");
                    for fragment in &flowcell.fragments {
                        uncommitted[fragment.origin] += fragment.lanes;
                    }
                    outcome.failures.push(FlowcellFailure {
                        group: key,
                        barcodes: records.iter().map(|r| r.barcode.clone()).collect(),
                        lanes: flowcell.lanes(),
                        message,
                    });
                }
            }
        }
        for fragment in &plan.leftover {
            uncommitted[fragment.origin] += fragment.lanes;
        }

        for (origin, member) in members.into_iter().enumerate() {
            outcome.records.append(&mut committed[origin]);
            let rest = uncommitted[origin];
            if rest == 0 {
                continue;
            }
            if identity_committed[origin] {
                log::debug!("{} carries {rest} lanes to a new designation", member.barcode);
                outcome.records.push(member.carry_forward(rest));
            } else {
                let kept = self.keep_queued(member, rest, outcome);
                outcome.records.push(kept);
            }
        }
    }

    /// The request's own record keeps the lanes that were not committed.
    fn keep_queued(
        &mut self,
        mut member: DesignationRecord,
        lanes: u32,
        outcome: &mut AllocationOutcome,
    ) -> DesignationRecord {
        if member.requested_lanes() == lanes {
            return member;
        }
        member.number_lanes = Some(lanes);
        if member.id.is_some() {
            if let Err(err) = self.store.save(&member) {
                let warning = format!("Could not save remaining lanes of {}: {err}", member.barcode);
                log::warn!("{warning}");
                outcome.warnings.push(warning);
            }
        }
        member
    }

    fn commit_flowcell(
        &mut self,
        model: FlowcellType,
        group: FctGroupKey,
        records: &[DesignationRecord],
    ) -> std::result::Result<(FlowcellBatch, Vec<DesignationId>), String> {
        let lcsets: Vec<String> = records
            .iter()
            .map(|r| r.lcset.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let summary = match records.last() {
            Some(last) => format!("{} FCT ticket", last.barcode),
            None => return Err("empty flowcell".to_string()),
        };
        let request = TicketRequest {
            summary,
            flowcell_type: model,
            lanes: lane_layout(records, None),
            lcsets: lcsets.clone(),
        };

        let ticket = self
            .tickets
            .create_flowcell_ticket(&request)
            .map_err(|err| err.to_string())?;
        let ids = self
            .store
            .commit_allocation(records)
            .map_err(|err| format!("{} created but designations not saved: {err}", ticket.name))?;

        log::info!(
            "Created {} for {} lanes of {model} ({})",
            ticket.name,
            request.lanes.len(),
            lcsets.join(", ")
        );
        Ok((
            FlowcellBatch {
                ticket,
                flowcell_type: model,
                group,
                lanes: lane_layout(records, Some(&ids)),
                lcsets,
            },
            ids,
        ))
    }
}

/// Record for one fragment, moved to `IN_FCT`.
fn fragment_record(origin: &DesignationRecord, fragment: &Fragment) -> DesignationRecord {
    let mut record = if fragment.carries_identity {
        let mut kept = origin.clone();
        kept.number_lanes = Some(fragment.lanes);
        kept
    } else {
        origin.carry_forward(fragment.lanes)
    };
    record.status = DesignationStatus::InFct;
    record.allocated = true;
    record.selected = false;
    record
}

/// Lanes `1..=n` in fragment order.
fn lane_layout(records: &[DesignationRecord], ids: Option<&[DesignationId]>) -> Vec<LaneAssignment> {
    let mut lanes = Vec::new();
    for (i, record) in records.iter().enumerate() {
        let designation_id = match ids {
            Some(ids) => ids.get(i).copied(),
            None => record.id,
        };
        for _ in 0..record.requested_lanes() {
            lanes.push(LaneAssignment {
                lane: lanes.len() as u32 + 1,
                barcode: record.barcode.clone(),
                lcset: record.lcset.clone(),
                loading_conc: record.loading_conc,
                designation_id,
            });
        }
    }
    lanes
}
