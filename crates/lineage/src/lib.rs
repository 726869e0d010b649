//! # FCT Lineage
//!
//! Finds the lab batch (LCSET) a loading tube belongs to by walking the
//! sample instances recorded on the tube.
//!
//! ## Features
//!
//! - **Lineage resolution** - definite batches win over workflow batches;
//!   several candidates are reported as an ambiguity, never guessed
//! - **Token parsing** - free text is split into tube barcodes and batch names
//! - **Linking** - batches expand to their loading tubes, tubes resolve to one
//!   batch or wait for the user's choice
//! - **Batch cache** - LRU read-through cache with injected invalidation
//!
//! ## Architecture
//!
//! ```text
//! text ──> parse_tokens ──> tubes + batches
//!                               │
//!                          link / link_batches ──> LinkOutcome
//!                               │                    ├── assignments
//!                         LineageResolver            ├── ambiguous ──> apply_choices
//!                          │          │              └── messages
//!                    VesselStore   BatchCache
//! ```

mod cache;
mod error;
mod linking;
mod resolver;
mod store;
mod tokens;

pub use cache::{BatchCache, CacheStats, InvalidationPolicy, NeverInvalidate, TtlInvalidation};
pub use error::{LineageError, Result};
pub use linking::{
    merge_ambiguous, sort_ambiguous, unknown_lcset_message, LinkOutcome, TubeAssignment,
};
pub use resolver::{candidate_batches, AmbiguousAssignment, LineageResolution, LineageResolver};
pub use store::{InMemoryLabStore, LabSnapshot, VesselStore};
pub use tokens::{batch_name_for_token, split_tokens, ParsedTokens, TokenError, BATCH_PREFIX};
