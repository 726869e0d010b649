use crate::cache::BatchCache;
use crate::error::Result;
use crate::store::VesselStore;
use chrono::{DateTime, Utc};
use fct_model::{Batch, DesignationId, Vessel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Batch names a vessel's lineage points at.
///
/// Definite batches of the sample instances win; only when no instance has
/// one are the workflow batches used. A supplied filter is intersected last.
pub fn candidate_batches(vessel: &Vessel, filter: Option<&BTreeSet<String>>) -> BTreeSet<String> {
    let mut certain = BTreeSet::new();
    let mut ambiguous = BTreeSet::new();
    for instance in &vessel.sample_instances {
        match &instance.single_batch {
            Some(batch) => {
                certain.insert(batch.clone());
            }
            None => ambiguous.extend(instance.workflow_batches.iter().cloned()),
        }
    }

    let mut candidates = if certain.is_empty() { ambiguous } else { certain };
    if let Some(filter) = filter {
        candidates.retain(|name| filter.contains(name));
    }
    candidates
}

/// A tube whose lineage points at several batches, awaiting a choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousAssignment {
    pub barcode: String,
    pub tube_created_on: DateTime<Utc>,

    /// Ordered by name
    pub candidates: Vec<Batch>,

    /// Set when the ambiguity was found while rebuilding a persisted designation
    #[serde(default)]
    pub designation_id: Option<DesignationId>,

    #[serde(default)]
    pub selected_lcset: Option<String>,
}

impl AmbiguousAssignment {
    pub fn new(vessel: &Vessel, mut candidates: Vec<Batch>) -> Self {
        candidates.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            barcode: vessel.barcode.clone(),
            tube_created_on: vessel.created_on,
            candidates,
            designation_id: None,
            selected_lcset: None,
        }
    }

    pub fn candidate_names(&self) -> Vec<&str> {
        self.candidates.iter().map(|b| b.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineageResolution {
    Resolved(Batch),
    Ambiguous(AmbiguousAssignment),
    /// No batch; the caller drops the vessel
    Unassigned,
}

/// Resolves vessels to batch records, reading batch details through the cache.
pub struct LineageResolver<'a> {
    store: &'a dyn VesselStore,
    cache: &'a mut BatchCache,
}

impl<'a> LineageResolver<'a> {
    pub fn new(store: &'a dyn VesselStore, cache: &'a mut BatchCache) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &'a dyn VesselStore {
        self.store
    }

    pub fn resolve(
        &mut self,
        vessel: &Vessel,
        filter: Option<&BTreeSet<String>>,
    ) -> Result<LineageResolution> {
        let names = candidate_batches(vessel, filter);
        let mut batches = Vec::with_capacity(names.len());
        for name in &names {
            batches.push(self.batch(name)?);
        }

        Ok(match batches.len() {
            0 => {
                log::debug!("{} has no batch in its lineage", vessel.barcode);
                LineageResolution::Unassigned
            }
            1 => LineageResolution::Resolved(batches.remove(0)),
            n => {
                log::debug!("{} is ambiguous between {n} batches", vessel.barcode);
                LineageResolution::Ambiguous(AmbiguousAssignment::new(vessel, batches))
            }
        })
    }

    /// Batch record by name; a lineage name the store does not know keeps an empty URL.
    pub fn batch(&mut self, name: &str) -> Result<Batch> {
        match self.cache.get(name, self.store)? {
            Some(batch) => Ok(batch),
            None => {
                log::debug!("Batch {name} not in store");
                Ok(Batch::new(name, ""))
            }
        }
    }

    pub fn find_batch(&mut self, name: &str) -> Result<Option<Batch>> {
        self.cache.get(name, self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NeverInvalidate;
    use crate::store::fixtures::*;
    use crate::store::InMemoryLabStore;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn names(set: &BTreeSet<String>) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn certain_instances_resolve_to_their_batch() {
        let vessel = tube(
            "T1",
            vec![certain("S1", "LCSET-100"), certain("S2", "LCSET-100")],
        );
        assert_eq!(names(&candidate_batches(&vessel, None)), vec!["LCSET-100"]);
    }

    #[test]
    fn workflow_batches_are_ambiguous() {
        let vessel = tube("T2", vec![uncertain("S1", &["LCSET-10", "LCSET-11"])]);
        assert_eq!(
            names(&candidate_batches(&vessel, None)),
            vec!["LCSET-10", "LCSET-11"]
        );

        let mut store = InMemoryLabStore::new();
        store.insert_batch(Batch::new("LCSET-10", "u10"));
        let mut cache = BatchCache::new(8, Box::new(NeverInvalidate)).unwrap();
        let mut resolver = LineageResolver::new(&store, &mut cache);

        match resolver.resolve(&vessel, None).unwrap() {
            LineageResolution::Ambiguous(amb) => {
                assert_eq!(amb.barcode, "T2");
                assert_eq!(amb.candidate_names(), vec!["LCSET-10", "LCSET-11"]);
                assert_eq!(amb.candidates[0].ticket_url, "u10");
                assert_eq!(amb.candidates[1].ticket_url, "");
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[test]
    fn certain_batches_shadow_workflow_batches() {
        let vessel = tube(
            "T3",
            vec![
                certain("S1", "LCSET-1"),
                uncertain("S2", &["LCSET-2", "LCSET-3"]),
            ],
        );
        assert_eq!(names(&candidate_batches(&vessel, None)), vec!["LCSET-1"]);
    }

    #[test]
    fn filter_narrows_ambiguity() {
        let vessel = tube("T4", vec![uncertain("S1", &["LCSET-10", "LCSET-11"])]);
        let filter: BTreeSet<String> = ["LCSET-11".to_string()].into();
        assert_eq!(
            names(&candidate_batches(&vessel, Some(&filter))),
            vec!["LCSET-11"]
        );

        let unrelated: BTreeSet<String> = ["LCSET-99".to_string()].into();
        assert!(candidate_batches(&vessel, Some(&unrelated)).is_empty());
    }

    #[test]
    fn empty_lineage_is_unassigned() {
        let store = InMemoryLabStore::new();
        let mut cache = BatchCache::new(8, Box::new(NeverInvalidate)).unwrap();
        let mut resolver = LineageResolver::new(&store, &mut cache);
        let vessel = tube("T5", vec![]);
        assert_eq!(
            resolver.resolve(&vessel, None).unwrap(),
            LineageResolution::Unassigned
        );
    }

    fn batch_name() -> impl Strategy<Value = String> {
        (1u32..6).prop_map(|n| format!("LCSET-{n}"))
    }

    proptest! {
        #[test]
        fn resolution_is_idempotent(
            instances in prop::collection::vec(
                (prop::option::of(batch_name()), prop::collection::vec(batch_name(), 0..4)),
                0..6,
            ),
            filter in prop::option::of(prop::collection::btree_set(batch_name(), 0..4)),
        ) {
            let vessel = Vessel {
                barcode: "P1".to_string(),
                created_on: day(1),
                sample_instances: instances
                    .into_iter()
                    .enumerate()
                    .map(|(i, (single, workflow))| fct_model::SampleInstance {
                        sample_name: format!("S{i}"),
                        single_batch: single,
                        workflow_batches: workflow,
                        ..Default::default()
                    })
                    .collect(),
                events: vec![],
            };

            let first = candidate_batches(&vessel, filter.as_ref());
            let second = candidate_batches(&vessel, filter.as_ref());
            prop_assert_eq!(&first, &second);

            if let Some(filter) = &filter {
                prop_assert!(first.iter().all(|name| filter.contains(name)));
            }
        }
    }
}
