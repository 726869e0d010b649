//! # FCT Designation
//!
//! Builds one designation record per loading tube, applies bulk edits to
//! the working set and persists records the status lifecycle allows.
//!
//! ## Architecture
//!
//! ```text
//! TubeAssignment ──> LoadingTubeAggregate ──> DesignationBuilder ──> records (UNSAVED)
//!                     (events in window,        │
//!                      bucket entries,          └── rebuild_from_persisted (stored status)
//!                      controls)
//!
//! records + MultiEditTemplate ──> apply_multi_edit ──> DesignationStore
//! ```

mod aggregate;
mod builder;
mod error;
mod multi_edit;
mod persistence;
mod window;

pub use aggregate::LoadingTubeAggregate;
pub use builder::{BuildOutcome, DesignationBuilder};
pub use error::{DesignationError, Result, StoreError};
pub use multi_edit::{apply_multi_edit, MultiEditOutcome, MultiEditTemplate, PersistFailure};
pub use persistence::{DesignationStore, InMemoryDesignationStore, StoreResult};
pub use window::EventWindow;
