mod cache;
mod error;
mod parsing;
mod source;
mod types;

pub use cache::{CacheSettings, ElementCache};
pub use error::{ElementsError, IdentifierMismatch, SourceError};
pub use source::{SourceRegistry, DEFAULT_TIMEOUT};
pub use types::{CacheEntry, OrbitalElementSet};

#[cfg(test)]
pub(crate) mod tests_support {
    pub use super::parsing::parse_element_set;
    pub use super::source::ElementSource;
    pub use super::parsing::tests::{iss_payload, ISS_LINE1, ISS_LINE2, ISS_NAME};
    pub use super::source::tests::ScriptedSource;
}
