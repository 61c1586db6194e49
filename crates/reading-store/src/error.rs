use core_types::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Validation failed: {0}")]
    Validation(#[from] CoreError),

    #[error("Reading not found: {0}")]
    NotFound(String),

    #[error("A reading with id {0} already exists")]
    DuplicateId(String),

    #[error("Export failed: {0}")]
    Analytics(#[from] analytics::AnalyticsError),
}
