use fct_model::FlowcellType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AllocationError>;

#[derive(Error, Debug)]
pub enum AllocationError {
    #[error("Lane capacity for {0} must be greater than zero")]
    ZeroCapacity(FlowcellType),

    #[error("Flowcells per designation must be greater than zero")]
    ZeroFlowcellLimit,
}

/// Failures reported by the ticketing service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketError {
    #[error("Ticket rejected: {0}")]
    Rejected(String),

    #[error("Ticketing unavailable: {0}")]
    Unavailable(String),
}
