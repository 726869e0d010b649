//! # FCT Allocation
//!
//! Packs queued designations into sequencer flowcell lanes and creates one
//! flowcell tracking ticket (FCT) per committed flowcell.
//!
//! ## Algorithm
//!
//! 1. Partition queued records by [`FctGroupKey`](fct_model::FctGroupKey);
//!    groups never share a flowcell.
//! 2. Order each group by priority (HIGH, NORMAL, LOW), then by lane count,
//!    both descending.
//! 3. Fill flowcells in that order. A request that overflows the running
//!    flowcell is split: the part that fits keeps the record's identity, the
//!    rest is carried by a new record onto the next flowcell.
//! 4. Commit each flowcell on its own: ticket first, then the store write.
//!    A failed flowcell leaves its lanes queued and is reported.
//!
//! ```text
//! QUEUED records ──group──> plan_lanes ──> flowcell ──ticket──> store ──> FlowcellBatch
//!                                              │           │
//!                                              └── failure ┴──> lanes stay QUEUED
//! ```

mod engine;
mod error;
mod plan;
mod ticketing;

pub use engine::{
    AllocationConfig, AllocationEngine, AllocationOutcome, FlowcellBatch, FlowcellFailure,
    DEFAULT_MAX_FLOWCELLS_PER_REQUEST,
};
pub use error::{AllocationError, Result, TicketError};
pub use plan::{plan_lanes, Fragment, LanePlan, PlannedFlowcell};
pub use ticketing::{InMemoryTicketing, LaneAssignment, Ticket, TicketRequest, TicketingService};
