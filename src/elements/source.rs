use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SourceConfig;
use crate::elements::error::SourceError;

pub const CATALOG_ID_PLACEHOLDER: &str = "{catalog_id}";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Something that can hand back raw TLE text for a catalog id.
#[async_trait]
pub trait ElementSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch(&self, catalog_id: u32) -> Result<String, SourceError>;
}

/// Fetches element text over HTTP from a URL template.
pub struct HttpSource {
    name: String,
    url_template: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(
        name: impl Into<String>,
        url_template: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skypass/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            name: name.into(),
            url_template: url_template.into(),
            client,
        })
    }

    pub fn url_for(&self, catalog_id: u32) -> String {
        self.url_template
            .replace(CATALOG_ID_PLACEHOLDER, &catalog_id.to_string())
    }
}

#[async_trait]
impl ElementSource for HttpSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, catalog_id: u32) -> Result<String, SourceError> {
        let url = self.url_for(catalog_id);
        log::debug!("Fetching elements for {} from {}", catalog_id, url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status().as_u16()));
        }
        Ok(response.text().await?)
    }
}

/// Ordered list of sources tried front to back.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn ElementSource>>,
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn ElementSource>>) -> Self {
        Self { sources }
    }

    pub fn from_config(configs: &[SourceConfig]) -> Result<Self, SourceError> {
        let mut registry = Self::default();
        for config in configs {
            registry.push(Arc::new(HttpSource::new(
                config.name.clone(),
                config.url.clone(),
                config.timeout,
            )?));
        }
        Ok(registry)
    }

    pub fn push(&mut self, source: Arc<dyn ElementSource>) {
        self.sources.push(source);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ElementSource>> {
        self.sources.iter()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
