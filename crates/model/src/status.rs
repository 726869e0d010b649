use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a designation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesignationStatus {
    /// Built in memory, never persisted
    Unsaved,
    Saved,
    /// Waiting for flowcell allocation
    Queued,
    /// Lanes committed to a flowcell tracking batch
    InFct,
    Abandoned,
}

/// Where a status change is being requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditContext {
    /// Designation editing before allocation
    Designation,
    /// Management of already created flowcell batches
    FctManagement,
    /// The allocation engine itself
    Allocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusProperties {
    /// A row in this status may be edited outside FCT management
    pub modifiable: bool,
    /// A bulk edit may set this status
    pub targetable: bool,
    /// A row in this status may be written to the designation store
    pub persist_eligible: bool,
}

/// Result of asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Set(DesignationStatus),
    /// Abandoning a never-persisted row drops it from the working set
    Remove,
    Forbidden,
}

impl DesignationStatus {
    pub const ALL: [DesignationStatus; 5] = [
        DesignationStatus::Unsaved,
        DesignationStatus::Saved,
        DesignationStatus::Queued,
        DesignationStatus::InFct,
        DesignationStatus::Abandoned,
    ];

    pub const fn properties(self) -> StatusProperties {
        match self {
            DesignationStatus::Unsaved => StatusProperties {
                modifiable: true,
                targetable: false,
                persist_eligible: false,
            },
            DesignationStatus::Saved | DesignationStatus::Queued => StatusProperties {
                modifiable: true,
                targetable: true,
                persist_eligible: true,
            },
            DesignationStatus::InFct => StatusProperties {
                modifiable: false,
                targetable: false,
                persist_eligible: true,
            },
            DesignationStatus::Abandoned => StatusProperties {
                modifiable: false,
                targetable: true,
                persist_eligible: true,
            },
        }
    }

    /// Whether a row currently in this status may be changed in `ctx`.
    pub fn is_editable_in(self, ctx: EditContext) -> bool {
        self.properties().modifiable
            || (self == DesignationStatus::InFct && ctx == EditContext::FctManagement)
    }

    /// Whether a bulk edit issued in `ctx` may target this status.
    pub fn is_targetable_in(self, ctx: EditContext) -> bool {
        match ctx {
            EditContext::Allocation => false,
            EditContext::Designation | EditContext::FctManagement => self.properties().targetable,
        }
    }

    /// Statuses offered as bulk-edit targets in `ctx`.
    pub fn targetable_statuses(ctx: EditContext) -> Vec<DesignationStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.is_targetable_in(ctx))
            .collect()
    }

    /// Statuses the designation store accepts.
    pub fn persist_eligible() -> BTreeSet<DesignationStatus> {
        Self::ALL
            .into_iter()
            .filter(|s| s.properties().persist_eligible)
            .collect()
    }

    /// The single place transition rules live.
    pub fn transition(self, to: DesignationStatus, ctx: EditContext) -> Transition {
        use DesignationStatus::*;

        match (self, to) {
            (Unsaved, Abandoned) if ctx != EditContext::Allocation => Transition::Remove,
            (Unsaved, Saved | Queued) if ctx != EditContext::Allocation => Transition::Set(to),
            (Saved | Queued, Saved | Queued | Abandoned) if ctx != EditContext::Allocation => {
                Transition::Set(to)
            }
            (Queued, InFct) if ctx == EditContext::Allocation => Transition::Set(InFct),
            (InFct, Abandoned) if ctx == EditContext::FctManagement => Transition::Set(Abandoned),
            _ => Transition::Forbidden,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == DesignationStatus::Abandoned
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            DesignationStatus::Unsaved => "UNSAVED",
            DesignationStatus::Saved => "SAVED",
            DesignationStatus::Queued => "QUEUED",
            DesignationStatus::InFct => "IN_FCT",
            DesignationStatus::Abandoned => "ABANDONED",
        }
    }
}

impl fmt::Display for DesignationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DesignationStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&needle))
            .ok_or_else(|| ModelError::UnknownStatus(s.to_string()))
    }
}
