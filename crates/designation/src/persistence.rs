use crate::error::StoreError;
use fct_model::{DesignationId, DesignationRecord, DesignationStatus};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistence contract for designations.
///
/// Implementations must never let an identity enter `IN_FCT` twice, and must
/// refuse any write to an abandoned designation.
pub trait DesignationStore {
    /// Inserts or updates a designation and returns its identity.
    fn save(&mut self, record: &DesignationRecord) -> StoreResult<DesignationId>;

    fn get(&self, id: DesignationId) -> StoreResult<Option<DesignationRecord>>;

    fn load_with_status(
        &self,
        statuses: &BTreeSet<DesignationStatus>,
    ) -> StoreResult<Vec<DesignationRecord>>;

    /// Writes the `IN_FCT` records of one flowcell. Either every record is
    /// written or none is. Identities are returned in input order.
    fn commit_allocation(&mut self, records: &[DesignationRecord])
        -> StoreResult<Vec<DesignationId>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryDesignationStore {
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    records: BTreeMap<DesignationId, DesignationRecord>,
}

impl InMemoryDesignationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &DesignationRecord> {
        self.records.values()
    }

    fn allocate_id(&mut self) -> DesignationId {
        self.next_id += 1;
        DesignationId(self.next_id)
    }

    /// Checks a plain save against the stored row.
    fn check_save(&self, record: &DesignationRecord) -> StoreResult<()> {
        if !record.status.properties().persist_eligible {
            return Err(StoreError::NotPersistable {
                barcode: record.barcode.clone(),
                status: record.status,
            });
        }
        let stored_status = match record.id {
            Some(id) => Some(self.stored(id)?.status),
            None => None,
        };
        if let (Some(id), Some(DesignationStatus::Abandoned)) = (record.id, stored_status) {
            return Err(StoreError::Abandoned(id));
        }
        if record.status == DesignationStatus::InFct
            && stored_status != Some(DesignationStatus::InFct)
        {
            return Err(StoreError::AllocationOnly(record.barcode.clone()));
        }
        Ok(())
    }

    fn check_commit(&self, record: &DesignationRecord) -> StoreResult<()> {
        if record.status != DesignationStatus::InFct {
            return Err(StoreError::NotPersistable {
                barcode: record.barcode.clone(),
                status: record.status,
            });
        }
        if let Some(id) = record.id {
            match self.stored(id)?.status {
                DesignationStatus::Queued => {}
                DesignationStatus::Abandoned => return Err(StoreError::Abandoned(id)),
                DesignationStatus::InFct => return Err(StoreError::AlreadyAllocated(id)),
                status => return Err(StoreError::NotQueued { id, status }),
            }
        }
        Ok(())
    }

    fn stored(&self, id: DesignationId) -> StoreResult<&DesignationRecord> {
        self.records.get(&id).ok_or(StoreError::NotFound(id))
    }

    fn write(&mut self, record: &DesignationRecord) -> DesignationId {
        let id = match record.id {
            Some(id) => id,
            None => self.allocate_id(),
        };
        let mut stored = record.clone();
        stored.id = Some(id);
        stored.selected = false;
        self.records.insert(id, stored);
        id
    }
}

impl DesignationStore for InMemoryDesignationStore {
    fn save(&mut self, record: &DesignationRecord) -> StoreResult<DesignationId> {
        self.check_save(record)?;
        let id = self.write(record);
        log::debug!("Saved designation {id} for {} as {}", record.barcode, record.status);
        Ok(id)
    }

    fn get(&self, id: DesignationId) -> StoreResult<Option<DesignationRecord>> {
        Ok(self.records.get(&id).cloned())
    }

    fn load_with_status(
        &self,
        statuses: &BTreeSet<DesignationStatus>,
    ) -> StoreResult<Vec<DesignationRecord>> {
        Ok(self
            .records
            .values()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect())
    }

    fn commit_allocation(
        &mut self,
        records: &[DesignationRecord],
    ) -> StoreResult<Vec<DesignationId>> {
        let mut seen = BTreeSet::new();
        for record in records {
            self.check_commit(record)?;
            if let Some(id) = record.id {
                if !seen.insert(id) {
                    return Err(StoreError::AlreadyAllocated(id));
                }
            }
        }
        Ok(records.iter().map(|record| self.write(record)).collect())
    }
}
