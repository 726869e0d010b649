use thiserror::Error;

pub type Result<T> = std::result::Result<T, LineageError>;

#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Vessel store error: {0}")]
    Store(String),

    #[error("Invalid lab snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error("Batch cache capacity must be greater than zero")]
    ZeroCapacity,

    #[error(transparent)]
    Model(#[from] fct_model::ModelError),
}
