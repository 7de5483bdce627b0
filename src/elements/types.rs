use chrono::{DateTime, Utc};
use serde::Serialize;
use sgp4::Elements;
use utoipa::ToSchema;

use crate::elements::error::{IdentifierMismatch, SourceError};

/// A validated two-line element set for one catalog object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrbitalElementSet {
    pub name: String,
    pub catalog_id: u32,
    pub line1: String,
    pub line2: String,
}

impl OrbitalElementSet {
    /// Decode the lines into propagator elements.
    pub fn to_elements(&self) -> Result<Elements, SourceError> {
        Ok(Elements::from_tle(
            Some(self.name.clone()),
            self.line1.as_bytes(),
            self.line2.as_bytes(),
        )?)
    }
}

/// What the cache stores for one catalog id.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CacheEntry {
    pub elements: OrbitalElementSet,
    pub fetched_at: DateTime<Utc>,
    pub source: String,
    pub mismatch: Option<IdentifierMismatch>,
}

impl CacheEntry {
    pub fn is_live(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.fetched_at < ttl
    }
}
