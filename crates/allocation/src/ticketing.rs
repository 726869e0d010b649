use crate::error::TicketError;
use fct_model::{DesignationId, FlowcellType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One physical lane of a planned flowcell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneAssignment {
    /// 1-based lane number
    pub lane: u32,
    pub barcode: String,
    pub lcset: String,
    #[serde(default)]
    pub loading_conc: Option<Decimal>,
    #[serde(default)]
    pub designation_id: Option<DesignationId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRequest {
    pub summary: String,
    pub flowcell_type: FlowcellType,
    pub lanes: Vec<LaneAssignment>,

    /// Batches to link the new ticket to
    pub lcsets: Vec<String>,
}

/// Flowcell tracking ticket as returned by the ticketing system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub name: String,
    pub url: String,
}

pub trait TicketingService {
    fn create_flowcell_ticket(&mut self, request: &TicketRequest) -> Result<Ticket, TicketError>;
}

/// Ticketing service that numbers tickets `FCT-1`, `FCT-2`, ...
///
/// Requests that link any batch in `rejected_lcsets` fail, and so do the
/// next `fail_next` requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryTicketing {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub rejected_lcsets: BTreeSet<String>,
    #[serde(default)]
    pub fail_next: u32,
    #[serde(default)]
    next_number: u64,
    #[serde(default)]
    issued: Vec<Ticket>,
}

fn default_base_url() -> String {
    "https://tickets.example.org/browse".to_string()
}

impl Default for InMemoryTicketing {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            rejected_lcsets: BTreeSet::new(),
            fail_next: 0,
            next_number: 0,
            issued: Vec::new(),
        }
    }
}

impl InMemoryTicketing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_lcset(mut self, lcset: impl Into<String>) -> Self {
        self.rejected_lcsets.insert(lcset.into());
        self
    }

    pub fn issued(&self) -> &[Ticket] {
        &self.issued
    }
}

impl TicketingService for InMemoryTicketing {
    fn create_flowcell_ticket(&mut self, request: &TicketRequest) -> Result<Ticket, TicketError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(TicketError::Unavailable("service did not answer".to_string()));
        }
        if let Some(lcset) = request
            .lcsets
            .iter()
            .find(|l| self.rejected_lcsets.contains(*l))
        {
            return Err(TicketError::Rejected(format!("{lcset} cannot be linked")));
        }

        self.next_number += 1;
        let name = format!("FCT-{}", self.next_number);
        let ticket = Ticket {
            url: format!("{}/{name}", self.base_url.trim_end_matches('/')),
            name,
        };
        self.issued.push(ticket.clone());
        Ok(ticket)
    }
}
