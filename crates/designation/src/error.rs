use fct_model::{DesignationId, DesignationStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesignationError>;

#[derive(Error, Debug)]
pub enum DesignationError {
    #[error(transparent)]
    Lineage(#[from] fct_lineage::LineageError),

    #[error(transparent)]
    Model(#[from] fct_model::ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Event window starts after it ends")]
    InvalidWindow,

    #[error("Event window of {0} days reaches past the earliest representable date")]
    WindowOutOfRange(u32),
}

/// Failures of the designation store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Designation {0} not found")]
    NotFound(DesignationId),

    #[error("Designation for {barcode} in status {status} cannot be persisted")]
    NotPersistable {
        barcode: String,
        status: DesignationStatus,
    },

    #[error("Designation {0} is abandoned and cannot change")]
    Abandoned(DesignationId),

    #[error("Designation {0} is already allocated to a flowcell")]
    AlreadyAllocated(DesignationId),

    #[error("Designation {id} is stored as {status}; only QUEUED designations can be allocated")]
    NotQueued {
        id: DesignationId,
        status: DesignationStatus,
    },

    #[error("Designation for {0} can only reach IN_FCT through allocation")]
    AllocationOnly(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
