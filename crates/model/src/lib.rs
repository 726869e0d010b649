//! # FCT Model
//!
//! Shared vocabulary for flowcell designation planning.
//!
//! ## Contents
//!
//! - **Lab view** - vessels, sample instances, batches, bucket entries and
//!   loading events, as read from the lab's vessel store
//! - **Designations** - the per-loading-tube lane request and its derived
//!   flowcell grouping key
//! - **Status lifecycle** - which statuses can be edited, targeted and
//!   persisted, and which transitions are legal in which context
//!
//! ## Lifecycle
//!
//! ```text
//! UNSAVED ──save──> SAVED <──> QUEUED ──allocation──> IN_FCT
//!    │                │          │                      │
//!    └─(removed)      └──────────┴──> ABANDONED <───────┘ (FCT management only)
//! ```

mod designation;
mod error;
mod flowcell;
mod lab;
mod status;

pub use designation::{
    normalize_working_set, DesignationId, DesignationRecord, FctGroupKey, IndexType, Priority,
    RegulatoryDesignation, CONTROLS,
};
pub use error::{ModelError, Result};
pub use flowcell::FlowcellType;
pub use lab::{
    Batch, BatchStartingVessel, BucketEntry, LabEvent, LabEventType, Product, ProductOrder,
    SampleInstance, Vessel, VesselRef,
};
pub use status::{DesignationStatus, EditContext, StatusProperties, Transition};
