use thiserror::Error;

/// Failure of a single element source. Network and parse failures are
/// treated alike when falling through to the next source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("invalid TLE format: {0}")]
    InvalidFormat(String),
    #[error("invalid TLE: {0}")]
    InvalidTle(#[from] sgp4::TleError),
}

#[derive(Debug, Error)]
pub enum ElementsError {
    #[error("invalid catalog id {0}: must be a positive integer")]
    InvalidCatalogId(u32),
    #[error("no element data for catalog id {catalog_id} ({})", summarize(.failures))]
    DataUnavailable {
        catalog_id: u32,
        failures: Vec<(String, SourceError)>,
    },
}

/// The fetched element set carries a different catalog number than the one
/// requested. Logged and kept on the cache entry, never returned as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, serde::Serialize, utoipa::ToSchema)]
#[error("requested catalog id {requested} but element set carries {embedded}")]
pub struct IdentifierMismatch {
    pub requested: u32,
    pub embedded: u32,
}

fn summarize(failures: &[(String, SourceError)]) -> String {
    if failures.is_empty() {
        return "no sources configured".to_string();
    }
    failures
        .iter()
        .map(|(source, err)| format!("{}: {}", source, err))
        .collect::<Vec<_>>()
        .join("; ")
}
