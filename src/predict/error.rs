use thiserror::Error;

use crate::elements::{ElementsError, SourceError};

#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid {field}: {message}")]
    InvalidInput { field: &'static str, message: String },
    #[error(transparent)]
    DataUnavailable(ElementsError),
    #[error("invalid element set: {0}")]
    InvalidElements(String),
    #[error("Propagation error: {0}")]
    Propagation(String),
    #[error("search task failed: {0}")]
    Worker(String),
}

impl PredictError {
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        PredictError::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

impl From<ElementsError> for PredictError {
    fn from(err: ElementsError) -> Self {
        match err {
            ElementsError::InvalidCatalogId(id) => PredictError::invalid(
                "catalog_id",
                format!("must be a positive integer, got {}", id),
            ),
            other => PredictError::DataUnavailable(other),
        }
    }
}

impl From<SourceError> for PredictError {
    fn from(err: SourceError) -> Self {
        PredictError::InvalidElements(err.to_string())
    }
}

impl From<sgp4::ElementsError> for PredictError {
    fn from(err: sgp4::ElementsError) -> Self {
        PredictError::InvalidElements(err.to_string())
    }
}
