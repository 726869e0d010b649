use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Unknown designation status: {0}")]
    UnknownStatus(String),

    #[error("Unknown flowcell type: {0}")]
    UnknownFlowcellType(String),

    #[error("Unknown lab event type: {0}")]
    UnknownEventType(String),

    #[error("Unknown {kind}: {value}")]
    UnknownValue { kind: &'static str, value: String },

    #[error("Cannot split {barcode}: {allocated} of {requested} lanes")]
    InvalidSplit {
        barcode: String,
        allocated: u32,
        requested: u32,
    },
}
