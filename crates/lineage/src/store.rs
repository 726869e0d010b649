use crate::error::Result;
use fct_model::{Batch, LabEventType, Vessel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Read contract of the lab's vessel and event store.
pub trait VesselStore {
    fn find_vessel(&self, barcode: &str) -> Result<Option<Vessel>>;

    fn find_batch(&self, name: &str) -> Result<Option<Batch>>;

    /// Tubes downstream of the batch's starting vessels that were made by a
    /// `kind` transfer, ordered by barcode.
    fn loading_tubes_for_batch(&self, batch: &str, kind: LabEventType) -> Result<Vec<Vessel>>;
}

/// Serialized form of a lab store, as loaded from a JSON fixture.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabSnapshot {
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub vessels: Vec<Vessel>,
}

/// Vessel store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLabStore {
    vessels: BTreeMap<String, Vessel>,
    batches: BTreeMap<String, Batch>,
}

impl InMemoryLabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: LabSnapshot) -> Self {
        let mut store = Self::new();
        for batch in snapshot.batches {
            store.insert_batch(batch);
        }
        for vessel in snapshot.vessels {
            store.insert_vessel(vessel);
        }
        store
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let snapshot: LabSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn insert_vessel(&mut self, vessel: Vessel) {
        self.vessels.insert(vessel.barcode.clone(), vessel);
    }

    pub fn insert_batch(&mut self, batch: Batch) {
        self.batches.insert(batch.name.clone(), batch);
    }

    pub fn vessel_count(&self) -> usize {
        self.vessels.len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }
}

impl VesselStore for InMemoryLabStore {
    fn find_vessel(&self, barcode: &str) -> Result<Option<Vessel>> {
        Ok(self.vessels.get(barcode).cloned())
    }

    fn find_batch(&self, name: &str) -> Result<Option<Batch>> {
        Ok(self.batches.get(name).cloned())
    }

    fn loading_tubes_for_batch(&self, batch: &str, kind: LabEventType) -> Result<Vec<Vessel>> {
        Ok(self
            .vessels
            .values()
            .filter(|vessel| vessel.has_event_of(kind))
            .filter(|vessel| {
                vessel
                    .sample_instances
                    .iter()
                    .any(|si| si.all_batches().contains(batch))
            })
            .cloned()
            .collect())
    }
}
