use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Failed to write delimited export: {0}")]
    Export(#[from] csv::Error),

    #[error("Delimiter {0:?} cannot be used for export")]
    InvalidDelimiter(char),

    #[error("An unexpected error occurred during analytics calculation: {0}")]
    InternalError(String),
}
