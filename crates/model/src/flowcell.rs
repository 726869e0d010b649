use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sequencer flowcell model. Each model has a fixed lane count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowcellType {
    MiSeq,
    HiSeq2000,
    HiSeq2500RapidRun,
    HiSeq2500HighOutput,
    HiSeq4000,
    HiSeqX10,
    NovaSeq,
    NovaSeqS4,
    NextSeq,
    Other,
}

impl FlowcellType {
    pub const ALL: [FlowcellType; 10] = [
        FlowcellType::MiSeq,
        FlowcellType::HiSeq2000,
        FlowcellType::HiSeq2500RapidRun,
        FlowcellType::HiSeq2500HighOutput,
        FlowcellType::HiSeq4000,
        FlowcellType::HiSeqX10,
        FlowcellType::NovaSeq,
        FlowcellType::NovaSeqS4,
        FlowcellType::NextSeq,
        FlowcellType::Other,
    ];

    /// Lanes on one physical flowcell of this model. `Other` has no known
    /// geometry.
    pub const fn lane_count(self) -> Option<u32> {
        match self {
            FlowcellType::MiSeq => Some(1),
            FlowcellType::HiSeq2000 => Some(8),
            FlowcellType::HiSeq2500RapidRun => Some(2),
            FlowcellType::HiSeq2500HighOutput => Some(8),
            FlowcellType::HiSeq4000 => Some(8),
            FlowcellType::HiSeqX10 => Some(8),
            FlowcellType::NovaSeq => Some(2),
            FlowcellType::NovaSeqS4 => Some(4),
            FlowcellType::NextSeq => Some(4),
            FlowcellType::Other => None,
        }
    }

    /// Whether flowcell tracking tickets can be created for this model.
    pub const fn creates_fct(self) -> bool {
        self.lane_count().is_some()
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            FlowcellType::MiSeq => "MiSeq Flowcell",
            FlowcellType::HiSeq2000 => "HiSeq 2000 Flowcell",
            FlowcellType::HiSeq2500RapidRun => "HiSeq 2500 Rapid Run Flowcell",
            FlowcellType::HiSeq2500HighOutput => "HiSeq 2500 High Output Flowcell",
            FlowcellType::HiSeq4000 => "HiSeq 4000 Flowcell",
            FlowcellType::HiSeqX10 => "HiSeq X 10 Flowcell",
            FlowcellType::NovaSeq => "NovaSeq Flowcell",
            FlowcellType::NovaSeqS4 => "NovaSeq S4 Flowcell",
            FlowcellType::NextSeq => "NextSeq Flowcell",
            FlowcellType::Other => "Unknown Flowcell",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            FlowcellType::MiSeq => "mi_seq",
            FlowcellType::HiSeq2000 => "hi_seq2000",
            FlowcellType::HiSeq2500RapidRun => "hi_seq2500_rapid_run",
            FlowcellType::HiSeq2500HighOutput => "hi_seq2500_high_output",
            FlowcellType::HiSeq4000 => "hi_seq4000",
            FlowcellType::HiSeqX10 => "hi_seq_x10",
            FlowcellType::NovaSeq => "nova_seq",
            FlowcellType::NovaSeqS4 => "nova_seq_s4",
            FlowcellType::NextSeq => "next_seq",
            FlowcellType::Other => "other",
        }
    }
}

impl fmt::Display for FlowcellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FlowcellType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        FlowcellType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(needle) || t.display_name() == needle)
            .ok_or_else(|| ModelError::UnknownFlowcellType(s.to_string()))
    }
}
