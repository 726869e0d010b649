use chrono::{TimeZone, Utc};
use fct_allocation::{AllocationConfig, AllocationEngine, AllocationOutcome, InMemoryTicketing};
use fct_designation::{DesignationStore, InMemoryDesignationStore};
use fct_model::{
    normalize_working_set, DesignationId, DesignationRecord, DesignationStatus, FlowcellType,
    IndexType, Priority, RegulatoryDesignation,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn queued(barcode: &str, lcset: &str, lanes: u32, priority: Priority) -> DesignationRecord {
    let mut r = DesignationRecord::new(
        barcode,
        lcset,
        Utc.with_ymd_and_hms(2024, 7, 1, 10, 0, 0).unwrap(),
    );
    r.status = DesignationStatus::Queued;
    r.number_lanes = Some(lanes);
    r.priority = priority;
    r.sequencer_model = Some(FlowcellType::HiSeq4000);
    r.read_length = Some(151);
    r.paired_end_read = Some(true);
    r.index_type = Some(IndexType::Dual);
    r.number_cycles = r.calculate_cycles();
    r.regulatory_designation = Some(RegulatoryDesignation::Research);
    r
}

fn saved(store: &mut InMemoryDesignationStore, mut record: DesignationRecord) -> DesignationRecord {
    record.id = Some(store.save(&record).expect("save"));
    record
}

fn allocate(
    config: AllocationConfig,
    tickets: &mut InMemoryTicketing,
    store: &mut InMemoryDesignationStore,
    records: Vec<DesignationRecord>,
) -> AllocationOutcome {
    let mut engine = AllocationEngine::new(config, tickets, store).expect("engine");
    engine.allocate_to_flowcells(records)
}

fn lane_barcodes(outcome: &AllocationOutcome, batch: usize) -> Vec<&str> {
    outcome.batches[batch]
        .lanes
        .iter()
        .map(|l| l.barcode.as_str())
        .collect()
}

fn summary(records: &[DesignationRecord]) -> Vec<(&str, Option<u64>, DesignationStatus, u32)> {
    records
        .iter()
        .map(|r| {
            (
                r.barcode.as_str(),
                r.id.map(|id| id.0),
                r.status,
                r.requested_lanes(),
            )
        })
        .collect()
}

#[test]
fn priority_order_and_split_carry_to_next_flowcell() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![
        saved(&mut store, queued("TUBE-A", "LCSET-1", 5, Priority::Low)),
        saved(&mut store, queued("TUBE-B", "LCSET-1", 3, Priority::High)),
        saved(&mut store, queued("TUBE-C", "LCSET-2", 2, Priority::Normal)),
    ];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 2);
    assert_eq!(
        lane_barcodes(&outcome, 0),
        vec!["TUBE-B", "TUBE-B", "TUBE-B", "TUBE-C", "TUBE-C", "TUBE-A", "TUBE-A", "TUBE-A"]
    );
    assert_eq!(lane_barcodes(&outcome, 1), vec!["TUBE-A", "TUBE-A"]);
    assert_eq!(outcome.batches[0].lcsets, vec!["LCSET-1", "LCSET-2"]);
    assert_eq!(outcome.batches[0].ticket.name, "FCT-1");
    assert_eq!(
        outcome.batches[0].lanes.iter().map(|l| l.lane).collect::<Vec<_>>(),
        (1..=8).collect::<Vec<u32>>()
    );

    assert_eq!(
        summary(&outcome.records),
        vec![
            ("TUBE-A", Some(1), DesignationStatus::InFct, 3),
            ("TUBE-A", Some(4), DesignationStatus::InFct, 2),
            ("TUBE-B", Some(2), DesignationStatus::InFct, 3),
            ("TUBE-C", Some(3), DesignationStatus::InFct, 2),
        ]
    );
    assert!(outcome.records.iter().all(|r| r.allocated));
    assert_eq!(
        outcome.batches[1].lanes[0].designation_id,
        Some(DesignationId(4))
    );
}

#[test]
fn full_flowcells_only_leaves_the_tail_queued() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![
        saved(&mut store, queued("T09", "LCSET-1", 9, Priority::Normal)),
        saved(&mut store, queued("T10", "LCSET-1", 10, Priority::Normal)),
        saved(&mut store, queued("T11", "LCSET-1", 11, Priority::Normal)),
    ];

    let outcome = allocate(
        AllocationConfig::full_flowcells_only(),
        &mut tickets,
        &mut store,
        records,
    );

    assert_eq!(outcome.batches.len(), 3);
    assert!(outcome.batches.iter().all(|b| b.lanes.len() == 8));
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("T09", None, DesignationStatus::Queued, 6),
            ("T09", Some(1), DesignationStatus::InFct, 3),
            ("T10", Some(2), DesignationStatus::InFct, 5),
            ("T10", Some(5), DesignationStatus::InFct, 5),
            ("T11", Some(3), DesignationStatus::InFct, 8),
            ("T11", Some(4), DesignationStatus::InFct, 3),
        ]
    );
    let remainder = &outcome.records[0];
    assert!(remainder.selected);
    assert!(!remainder.allocated);
}

#[test]
fn high_priority_goes_first_and_small_requests_wait() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![
        saved(&mut store, queued("T01", "LCSET-1", 1, Priority::Normal)),
        saved(&mut store, queued("T09", "LCSET-1", 9, Priority::High)),
        saved(&mut store, queued("T10", "LCSET-1", 10, Priority::Normal)),
    ];

    let outcome = allocate(
        AllocationConfig::full_flowcells_only(),
        &mut tickets,
        &mut store,
        records,
    );

    assert_eq!(outcome.batches.len(), 2);
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("T01", Some(1), DesignationStatus::Queued, 1),
            ("T09", Some(2), DesignationStatus::InFct, 8),
            ("T09", Some(4), DesignationStatus::InFct, 1),
            ("T10", None, DesignationStatus::Queued, 3),
            ("T10", Some(3), DesignationStatus::InFct, 7),
        ]
    );
}

#[test]
fn group_below_one_flowcell_is_skipped() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![
        saved(&mut store, queued("T1", "LCSET-1", 2, Priority::Normal)),
        saved(&mut store, queued("T2", "LCSET-1", 1, Priority::Normal)),
    ];

    let outcome = allocate(
        AllocationConfig::full_flowcells_only(),
        &mut tickets,
        &mut store,
        records,
    );

    assert!(outcome.batches.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("3 lanes cannot fill a 8 lane flowcell"));
    assert!(outcome
        .records
        .iter()
        .all(|r| r.status == DesignationStatus::Queued));
    assert!(tickets.issued().is_empty());
}

#[test]
fn rejected_ticket_keeps_that_flowcell_uncommitted() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new().reject_lcset("LCSET-9");
    let records = vec![
        saved(&mut store, queued("T1", "LCSET-1", 12, Priority::High)),
        saved(&mut store, queued("T2", "LCSET-9", 4, Priority::Normal)),
    ];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].barcodes, vec!["T1", "T2"]);
    assert_eq!(outcome.failures[0].lanes, 8);
    assert!(outcome.failures[0].message.contains("LCSET-9"));
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("T1", None, DesignationStatus::Queued, 4),
            ("T1", Some(1), DesignationStatus::InFct, 8),
            ("T2", Some(2), DesignationStatus::Queued, 4),
        ]
    );
    let stored_t2 = store
        .get(DesignationId(2))
        .expect("get")
        .expect("stored T2");
    assert_eq!(stored_t2.status, DesignationStatus::Queued);
}

#[test]
fn failed_first_flowcell_leaves_identity_queued() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    tickets.fail_next = 1;
    let records = vec![
        saved(&mut store, queued("T1", "LCSET-1", 12, Priority::High)),
        saved(&mut store, queued("T2", "LCSET-2", 4, Priority::Normal)),
    ];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 1);
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("T1", Some(1), DesignationStatus::Queued, 8),
            ("T1", Some(3), DesignationStatus::InFct, 4),
            ("T2", Some(2), DesignationStatus::InFct, 4),
        ]
    );
    let stored = store
        .get(DesignationId(1))
        .expect("get")
        .expect("stored T1");
    assert_eq!(stored.number_lanes, Some(8));
    assert_eq!(stored.status, DesignationStatus::Queued);
}

#[test]
fn repeated_splits_keep_identity_on_the_first_fragment() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![saved(
        &mut store,
        queued("BIG", "LCSET-1", 19, Priority::Normal),
    )];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 3);
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("BIG", Some(1), DesignationStatus::InFct, 8),
            ("BIG", Some(2), DesignationStatus::InFct, 8),
            ("BIG", Some(3), DesignationStatus::InFct, 3),
        ]
    );
    assert_eq!(outcome.batches[2].ticket.name, "FCT-3");
    assert_eq!(outcome.batches[2].lanes.len(), 3);
}

#[test]
fn groups_never_share_a_flowcell() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let mut clinical = queued("CLIN", "LCSET-1", 4, Priority::Normal);
    clinical.regulatory_designation = Some(RegulatoryDesignation::Clinical);
    let records = vec![
        saved(&mut store, clinical),
        saved(&mut store, queued("RES", "LCSET-1", 4, Priority::Normal)),
    ];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 2);
    for batch in &outcome.batches {
        let barcodes: std::collections::BTreeSet<&str> =
            batch.lanes.iter().map(|l| l.barcode.as_str()).collect();
        assert_eq!(barcodes.len(), 1);
        assert_eq!(batch.lanes.len(), 4);
    }
}

#[test]
fn records_outside_allocation_pass_through() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();

    let mut saved_only = queued("SAVED", "LCSET-1", 2, Priority::Normal);
    saved_only.status = DesignationStatus::Saved;
    let no_lanes = queued("EMPTY", "LCSET-1", 0, Priority::Normal);
    let mut no_model = queued("NOMODEL", "LCSET-1", 2, Priority::Normal);
    no_model.sequencer_model = None;
    let mut other = queued("OTHER", "LCSET-1", 2, Priority::Normal);
    other.sequencer_model = Some(FlowcellType::Other);

    let outcome = allocate(
        AllocationConfig::default(),
        &mut tickets,
        &mut store,
        vec![saved_only, no_lanes, no_model, other],
    );

    assert!(outcome.batches.is_empty());
    assert_eq!(outcome.records.len(), 4);
    assert_eq!(outcome.warnings.len(), 3);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.status != DesignationStatus::InFct));
}

#[test]
fn lane_capacity_override_is_used() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let mut config = AllocationConfig::default();
    config.lane_capacity.insert(FlowcellType::HiSeq4000, 2);
    let records = vec![saved(&mut store, queued("T1", "LCSET-1", 4, Priority::Normal))];

    let outcome = allocate(config, &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 2);
    assert!(outcome.batches.iter().all(|b| b.lanes.len() == 2));
}

#[test]
fn zero_capacity_is_rejected() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let mut config = AllocationConfig::default();
    config.lane_capacity.insert(FlowcellType::MiSeq, 0);
    assert!(AllocationEngine::new(config, &mut tickets, &mut store).is_err());
}

#[test]
fn stale_queued_copy_of_a_saved_row_is_not_allocated() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let mut record = queued("T1", "LCSET-1", 8, Priority::Normal);
    record.status = DesignationStatus::Saved;
    let mut record = saved(&mut store, record);
    record.status = DesignationStatus::Queued;

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, vec![record]);

    assert!(outcome.batches.is_empty());
    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].message.contains("only QUEUED"));
    assert_eq!(
        summary(&outcome.records),
        vec![("T1", Some(1), DesignationStatus::Queued, 8)]
    );
    let stored = store.get(DesignationId(1)).expect("get").expect("stored T1");
    assert_eq!(stored.status, DesignationStatus::Saved);
}

#[test]
fn oversized_requests_stay_queued_with_a_warning() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let huge = u32::MAX / 2 + 1;
    let records = vec![
        saved(&mut store, queued("BIG-1", "LCSET-1", huge, Priority::High)),
        saved(&mut store, queued("BIG-2", "LCSET-1", huge, Priority::High)),
        saved(&mut store, queued("T1", "LCSET-1", 3, Priority::Normal)),
    ];

    let outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 1);
    assert_eq!(lane_barcodes(&outcome, 0), vec!["T1", "T1", "T1"]);
    assert_eq!(
        summary(&outcome.records),
        vec![
            ("BIG-1", Some(1), DesignationStatus::Queued, huge),
            ("BIG-2", Some(2), DesignationStatus::Queued, huge),
            ("T1", Some(3), DesignationStatus::InFct, 3),
        ]
    );
    assert_eq!(
        outcome
            .warnings
            .iter()
            .filter(|w| w.contains("flowcells of"))
            .count(),
        2
    );
}

#[test]
fn flowcell_limit_is_configurable() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let config = AllocationConfig {
        max_flowcells_per_request: 2,
        ..AllocationConfig::default()
    };
    let records = vec![
        saved(&mut store, queued("T1", "LCSET-1", 16, Priority::Normal)),
        saved(&mut store, queued("T2", "LCSET-1", 17, Priority::Normal)),
    ];

    let outcome = allocate(config, &mut tickets, &mut store, records);

    assert_eq!(outcome.batches.len(), 2);
    assert!(outcome
        .records
        .iter()
        .filter(|r| r.barcode == "T2")
        .all(|r| r.status == DesignationStatus::Queued));
    assert!(AllocationConfig {
        max_flowcells_per_request: 0,
        ..AllocationConfig::default()
    }
    .validate()
    .is_err());
}

#[test]
fn normalizing_after_a_split_keeps_every_committed_lane() {
    let mut store = InMemoryDesignationStore::new();
    let mut tickets = InMemoryTicketing::new();
    let records = vec![saved(&mut store, queued("T1", "LCSET-1", 16, Priority::Normal))];

    let mut outcome = allocate(AllocationConfig::default(), &mut tickets, &mut store, records);
    normalize_working_set(&mut outcome.records);

    assert_eq!(
        summary(&outcome.records),
        vec![
            ("T1", Some(1), DesignationStatus::InFct, 8),
            ("T1", Some(2), DesignationStatus::InFct, 8),
        ]
    );
}

fn arb_record() -> impl Strategy<Value = (u8, u32, u8, bool)> {
    (0u8..6, 0u32..14, 0u8..3, any::<bool>())
}

proptest! {
    #[test]
    fn lanes_are_conserved_and_groups_stay_pure(
        specs in prop::collection::vec(arb_record(), 1..10),
        partial in any::<bool>(),
    ) {
        let mut store = InMemoryDesignationStore::new();
        let mut tickets = InMemoryTicketing::new();
        let mut requested = std::collections::BTreeMap::new();
        let records: Vec<DesignationRecord> = specs
            .iter()
            .enumerate()
            .map(|(i, &(model, lanes, priority, clinical))| {
                let priority = [Priority::Low, Priority::Normal, Priority::High][priority as usize];
                let mut r = queued(&format!("T{i:02}"), "LCSET-1", lanes, priority);
                r.sequencer_model = Some(
                    [
                        FlowcellType::MiSeq,
                        FlowcellType::HiSeq2500RapidRun,
                        FlowcellType::HiSeq4000,
                        FlowcellType::NovaSeqS4,
                        FlowcellType::NextSeq,
                        FlowcellType::NovaSeq,
                    ][model as usize],
                );
                if clinical {
                    r.regulatory_designation = Some(RegulatoryDesignation::Clinical);
                }
                requested.insert(r.barcode.clone(), lanes);
                saved(&mut store, r)
            })
            .collect();
        let keys: std::collections::BTreeMap<String, fct_model::FctGroupKey> = records
            .iter()
            .map(|r| (r.barcode.clone(), r.group_key()))
            .collect();

        let config = AllocationConfig { partial_flowcells: partial, ..AllocationConfig::default() };
        let outcome = allocate(config, &mut tickets, &mut store, records);

        for (barcode, lanes) in &requested {
            let total: u32 = outcome
                .records
                .iter()
                .filter(|r| &r.barcode == barcode)
                .map(|r| r.requested_lanes())
                .sum();
            prop_assert_eq!(total, *lanes);
        }

        for batch in &outcome.batches {
            let capacity = batch.flowcell_type.lane_count().expect("flowcell geometry");
            prop_assert!(batch.lanes.len() as u32 <= capacity);
            for lane in &batch.lanes {
                prop_assert_eq!(keys[&lane.barcode], batch.group);
            }
        }

        let allocated = outcome
            .records
            .iter()
            .filter(|r| r.status == DesignationStatus::InFct)
            .map(|r| r.requested_lanes() as usize)
            .sum::<usize>();
        prop_assert_eq!(allocated, outcome.allocated_lanes());
    }
}
