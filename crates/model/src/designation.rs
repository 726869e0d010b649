use crate::error::{ModelError, Result};
use crate::flowcell::FlowcellType;
use crate::status::DesignationStatus;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Reserved product category for positive controls.
pub const CONTROLS: &str = "Controls";

/// Identity assigned by the designation store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesignationId(pub u64);

impl fmt::Display for DesignationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    /// Larger values are allocated first.
    pub const fn allocation_order(self) -> i32 {
        match self {
            Priority::High => 1,
            Priority::Normal => 0,
            Priority::Low => -1,
        }
    }
}

impl FromStr for Priority {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Ok(Priority::High),
            "NORMAL" => Ok(Priority::Normal),
            "LOW" => Ok(Priority::Low),
            _ => Err(ModelError::UnknownValue {
                kind: "priority",
                value: s.to_string(),
            }),
        }
    }
}

/// Molecular index layout; determines index read cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexType {
    Dual,
    Single,
    None,
}

impl IndexType {
    pub const fn index_size(self) -> u32 {
        match self {
            IndexType::Dual => 16,
            IndexType::Single => 8,
            IndexType::None => 0,
        }
    }
}

impl FromStr for IndexType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DUAL" => Ok(IndexType::Dual),
            "SINGLE" => Ok(IndexType::Single),
            "NONE" => Ok(IndexType::None),
            _ => Err(ModelError::UnknownValue {
                kind: "index type",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegulatoryDesignation {
    Clinical,
    Research,
    Mixed,
}

impl RegulatoryDesignation {
    pub fn from_clinical(clinical: bool) -> Self {
        if clinical {
            RegulatoryDesignation::Clinical
        } else {
            RegulatoryDesignation::Research
        }
    }

    /// Folds one more order's classification into the running one.
    pub fn combine(current: Option<Self>, clinical: bool) -> Self {
        let next = Self::from_clinical(clinical);
        match current {
            None => next,
            Some(existing) if existing == next => existing,
            Some(_) => RegulatoryDesignation::Mixed,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            RegulatoryDesignation::Clinical => "Clinical",
            RegulatoryDesignation::Research => "Research",
            RegulatoryDesignation::Mixed => "Clinical and Research",
        }
    }
}

impl fmt::Display for RegulatoryDesignation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Attributes two designations must share to be loaded on the same flowcell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FctGroupKey {
    pub sequencer_model: Option<FlowcellType>,
    pub number_cycles: Option<u32>,
    pub read_length: Option<u32>,
    pub index_type: Option<IndexType>,
    pub regulatory_designation: Option<RegulatoryDesignation>,
}

impl fmt::Display for FctGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "-".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "{} / {} cycles / read {} / {} index / {}",
            opt(&self.sequencer_model),
            opt(&self.number_cycles),
            opt(&self.read_length),
            self.index_type.map_or("-", |i| match i {
                IndexType::Dual => "dual",
                IndexType::Single => "single",
                IndexType::None => "no",
            }),
            opt(&self.regulatory_designation),
        )
    }
}

/// One loading tube's request for flowcell lanes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignationRecord {
    /// Store identity, absent until the first successful save
    #[serde(default)]
    pub id: Option<DesignationId>,

    pub barcode: String,

    /// Primary batch
    pub lcset: String,
    #[serde(default)]
    pub lcset_url: String,

    /// Batch picked by the user when the lineage was ambiguous
    #[serde(default)]
    pub chosen_lcset: Option<String>,

    #[serde(default)]
    pub additional_lcsets: Vec<String>,
    #[serde(default)]
    pub product_names: Vec<String>,
    #[serde(default)]
    pub starting_batch_vessels: String,

    #[serde(default)]
    pub tube_type: Option<String>,
    #[serde(default)]
    pub tube_dates: Vec<DateTime<Utc>>,

    #[serde(default)]
    pub regulatory_designation: Option<RegulatoryDesignation>,
    #[serde(default)]
    pub number_samples: u32,

    #[serde(default)]
    pub sequencer_model: Option<FlowcellType>,
    #[serde(default)]
    pub index_type: Option<IndexType>,
    #[serde(default)]
    pub number_cycles: Option<u32>,
    #[serde(default)]
    pub number_lanes: Option<u32>,
    #[serde(default)]
    pub read_length: Option<u32>,
    #[serde(default)]
    pub paired_end_read: Option<bool>,
    #[serde(default)]
    pub loading_conc: Option<Decimal>,
    #[serde(default)]
    pub pool_test: Option<bool>,

    #[serde(default)]
    pub priority: Priority,
    pub status: DesignationStatus,
    pub created_on: DateTime<Utc>,

    /// Latest loading event seen for the tube; changes when the tube is reloaded
    #[serde(default)]
    pub tube_event_id: Option<u64>,

    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub allocated: bool,
}

impl DesignationRecord {
    /// Fresh unsaved record for a tube in a batch.
    pub fn new(
        barcode: impl Into<String>,
        lcset: impl Into<String>,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            barcode: barcode.into(),
            lcset: lcset.into(),
            lcset_url: String::new(),
            chosen_lcset: None,
            additional_lcsets: Vec::new(),
            product_names: Vec::new(),
            starting_batch_vessels: String::new(),
            tube_type: None,
            tube_dates: Vec::new(),
            regulatory_designation: None,
            number_samples: 0,
            sequencer_model: None,
            index_type: None,
            number_cycles: None,
            number_lanes: None,
            read_length: None,
            paired_end_read: None,
            loading_conc: None,
            pool_test: None,
            priority: Priority::Normal,
            status: DesignationStatus::Unsaved,
            created_on,
            tube_event_id: None,
            selected: false,
            allocated: false,
        }
    }

    pub fn group_key(&self) -> FctGroupKey {
        FctGroupKey {
            sequencer_model: self.sequencer_model,
            number_cycles: self.number_cycles,
            read_length: self.read_length,
            index_type: self.index_type,
            regulatory_designation: self.regulatory_designation,
        }
    }

    pub fn allocation_order(&self) -> i32 {
        self.priority.allocation_order()
    }

    pub fn requested_lanes(&self) -> u32 {
        self.number_lanes.unwrap_or(0)
    }

    /// Index size plus read length, or `None` while the read length is unknown.
    ///
    /// `paired_end_read` is carried for the flowcell ticket only and does not
    /// change the cycle count.
    pub fn calculate_cycles(&self) -> Option<u32> {
        let read_length = self.read_length?;
        let index = self.index_type.map_or(0, IndexType::index_size);
        Some(index + read_length)
    }

    /// New queued record carrying `lanes` lanes of this request forward.
    ///
    /// The copy has no identity; every planning attribute is taken over
    /// explicitly so that the two fragments can diverge afterwards.
    pub fn carry_forward(&self, lanes: u32) -> DesignationRecord {
        DesignationRecord {
            id: None,
            barcode: self.barcode.clone(),
            lcset: self.lcset.clone(),
            lcset_url: self.lcset_url.clone(),
            chosen_lcset: self.chosen_lcset.clone(),
            additional_lcsets: self.additional_lcsets.clone(),
            product_names: self.product_names.clone(),
            starting_batch_vessels: self.starting_batch_vessels.clone(),
            tube_type: self.tube_type.clone(),
            tube_dates: self.tube_dates.clone(),
            regulatory_designation: self.regulatory_designation,
            number_samples: self.number_samples,
            sequencer_model: self.sequencer_model,
            index_type: self.index_type,
            number_cycles: self.number_cycles,
            number_lanes: Some(lanes),
            read_length: self.read_length,
            paired_end_read: self.paired_end_read,
            loading_conc: self.loading_conc,
            pool_test: self.pool_test,
            priority: self.priority,
            status: DesignationStatus::Queued,
            created_on: self.created_on,
            tube_event_id: self.tube_event_id,
            selected: true,
            allocated: false,
        }
    }

    /// Keeps `allocated` lanes on `self` and returns the remainder as a new record.
    pub fn split(&mut self, allocated: u32) -> Result<DesignationRecord> {
        let requested = self.requested_lanes();
        if allocated == 0 || allocated >= requested {
            return Err(ModelError::InvalidSplit {
                barcode: self.barcode.clone(),
                allocated,
                requested,
            });
        }
        let remainder = self.carry_forward(requested - allocated);
        self.number_lanes = Some(allocated);
        Ok(remainder)
    }

    fn equality_key(&self) -> EqualityKey<'_> {
        match self.id {
            Some(id) => EqualityKey::Persisted(id),
            None => EqualityKey::Transient(BusinessKey {
                barcode: &self.barcode,
                lcset: &self.lcset,
                tube_event_id: self.tube_event_id,
                status: self.status,
                number_lanes: self.number_lanes,
                priority: self.priority,
                created_on: self.created_on,
            }),
        }
    }

    /// Barcode, then identity (absent first), then newest first.
    pub fn cmp_by_barcode_id_date(&self, other: &Self) -> Ordering {
        self.barcode
            .cmp(&other.barcode)
            .then_with(|| match (self.id, other.id) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            })
            .then_with(|| other.created_on.cmp(&self.created_on))
    }
}

#[derive(PartialEq, Eq, Hash)]
struct BusinessKey<'a> {
    barcode: &'a str,
    lcset: &'a str,
    tube_event_id: Option<u64>,
    status: DesignationStatus,
    number_lanes: Option<u32>,
    priority: Priority,
    created_on: DateTime<Utc>,
}

/// Persisted records are equal when their identities are; unsaved records
/// compare on business fields. The two kinds are never equal.
#[derive(PartialEq, Eq, Hash)]
enum EqualityKey<'a> {
    Persisted(DesignationId),
    Transient(BusinessKey<'a>),
}

impl PartialEq for DesignationRecord {
    fn eq(&self, other: &Self) -> bool {
        self.equality_key() == other.equality_key()
    }
}

impl Eq for DesignationRecord {}

impl Hash for DesignationRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.equality_key().hash(state);
    }
}

/// Deselects every row, drops business-equal duplicates and sorts the rest.
pub fn normalize_working_set(records: &mut Vec<DesignationRecord>) {
    records.sort_by(DesignationRecord::cmp_by_barcode_id_date);
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    for mut record in records.drain(..) {
        record.selected = false;
        if seen.insert(record.clone()) {
            kept.push(record);
        }
    }
    *records = kept;
}
