use crate::designation::IndexType;
use crate::error::{ModelError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Lab batch (LCSET), identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Batch {
    pub name: String,

    /// Browser URL of the batch's tracking ticket
    #[serde(default)]
    pub ticket_url: String,
}

impl Batch {
    pub fn new(name: impl Into<String>, ticket_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticket_url: ticket_url.into(),
        }
    }
}

/// Kind of a recorded lab event. Only the loading transfers matter here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabEventType {
    DenatureTransfer,
    NormalizationTransfer,
    PoolingTransfer,
    Other,
}

impl LabEventType {
    pub const LOADING: [LabEventType; 3] = [
        LabEventType::DenatureTransfer,
        LabEventType::NormalizationTransfer,
        LabEventType::PoolingTransfer,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            LabEventType::DenatureTransfer => "DenatureTransfer",
            LabEventType::NormalizationTransfer => "NormalizationTransfer",
            LabEventType::PoolingTransfer => "PoolingTransfer",
            LabEventType::Other => "Other",
        }
    }

    /// Tube type shown for a loading tube made by this event.
    pub const fn tube_type(self) -> &'static str {
        match self {
            LabEventType::DenatureTransfer => "Denature",
            LabEventType::NormalizationTransfer => "Norm",
            LabEventType::PoolingTransfer => "Pooled norm",
            LabEventType::Other => "Other",
        }
    }
}

impl fmt::Display for LabEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LabEventType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "denature_transfer" | "denaturetransfer" | "denature" => {
                Ok(LabEventType::DenatureTransfer)
            }
            "normalization_transfer" | "normalizationtransfer" | "norm" => {
                Ok(LabEventType::NormalizationTransfer)
            }
            "pooling_transfer" | "poolingtransfer" | "pooled_norm" | "poolnorm" => {
                Ok(LabEventType::PoolingTransfer)
            }
            _ => Err(ModelError::UnknownEventType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabEvent {
    pub id: u64,
    pub event_type: LabEventType,
    pub event_date: DateTime<Utc>,
}

/// Reference to a starting vessel, with the number of samples it holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VesselRef {
    pub barcode: String,
    #[serde(default = "one")]
    pub sample_count: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    #[serde(default)]
    pub read_length: Option<u32>,
    #[serde(default)]
    pub paired_end_read: Option<bool>,
    #[serde(default)]
    pub loading_concentration: Option<Decimal>,
    #[serde(default)]
    pub index_type: Option<IndexType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOrder {
    pub ticket_key: String,
    #[serde(default)]
    pub product: Option<Product>,

    /// Regulatory designation of the order's research project
    #[serde(default)]
    pub clinical: bool,
}

impl ProductOrder {
    /// Product name, or the bracketed order key when the order has no product.
    pub fn product_label(&self) -> String {
        match &self.product {
            Some(product) => product.name.clone(),
            None => format!("[{}]", self.ticket_key),
        }
    }
}

/// Work-queue link between a starting vessel and the batch processing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketEntry {
    pub batch: String,
    pub vessel: VesselRef,
    pub product_order: ProductOrder,
}

/// Starting vessel that was added to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchStartingVessel {
    pub batch: String,
    pub vessel: VesselRef,
}

/// Lineage view of one sample in a vessel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInstance {
    pub sample_name: String,

    /// Batch the lineage resolves to unambiguously, if any
    #[serde(default)]
    pub single_batch: Option<String>,

    /// Every workflow batch the sample could belong to
    #[serde(default)]
    pub workflow_batches: Vec<String>,

    #[serde(default)]
    pub bucket_entries: Vec<BucketEntry>,

    #[serde(default)]
    pub batch_starting_vessels: Vec<BatchStartingVessel>,
}

impl SampleInstance {
    /// True when this instance contributes to `batch`: its definite batch is
    /// `batch`, or it has no definite batch and `batch` is among its workflow batches.
    pub fn belongs_to(&self, batch: &str) -> bool {
        match &self.single_batch {
            Some(single) => single == batch,
            None => self.workflow_batches.iter().any(|b| b == batch),
        }
    }

    pub fn all_batches(&self) -> BTreeSet<&str> {
        self.single_batch
            .iter()
            .chain(self.workflow_batches.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Physical tube or plate. Read-only to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vessel {
    pub barcode: String,
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub sample_instances: Vec<SampleInstance>,
    #[serde(default)]
    pub events: Vec<LabEvent>,
}

impl Vessel {
    /// Events of the given kinds whose date falls in `[start, end]`.
    pub fn events_in_window<'a>(
        &'a self,
        kinds: &'a [LabEventType],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> impl Iterator<Item = &'a LabEvent> + 'a {
        self.events.iter().filter(move |e| {
            kinds.contains(&e.event_type) && e.event_date >= start && e.event_date <= end
        })
    }

    pub fn has_event_of(&self, kind: LabEventType) -> bool {
        self.events.iter().any(|e| e.event_type == kind)
    }
}
