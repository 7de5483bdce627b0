use std::time::Duration;

use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::elements::{CacheSettings, DEFAULT_TIMEOUT};
use crate::predict::{Observer, PredictError, SearchSettings, DEFAULT_FINE_RESOLUTION_MINUTES};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub observer: Option<ObserverConfig>,
    pub web: WebConfig,
    pub cache: CacheConfig,
    pub sources: Vec<SourceConfig>,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObserverConfig {
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(deserialize_with = "deserialize_duration")]
    pub ttl: Duration,
    pub max_entries: usize,
    pub eviction_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            ttl: settings.ttl.to_std().unwrap_or(Duration::from_secs(3600)),
            max_entries: settings.max_entries,
            eviction_batch: settings.eviction_batch,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    /// `{catalog_id}` is replaced with the requested number.
    pub url: String,
    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// CelesTrak's GP query first, its SATCAT TLE endpoint as backup.
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            name: "celestrak".to_string(),
            url: "https://celestrak.org/NORAD/elements/gp.php?CATNR={catalog_id}&FORMAT=tle"
                .to_string(),
            timeout: DEFAULT_TIMEOUT,
        },
        SourceConfig {
            name: "celestrak-satcat".to_string(),
            url: "https://celestrak.org/satcat/tle.php?CATNR={catalog_id}".to_string(),
            timeout: DEFAULT_TIMEOUT,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub samples_per_orbit: u32,
    pub hysteresis_deg: f64,
    pub fine_resolution_minutes: f64,
    pub default_min_elevation: f64,
    pub default_hours: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let settings = SearchSettings::default();
        Self {
            samples_per_orbit: settings.samples_per_orbit,
            hysteresis_deg: settings.hysteresis_deg,
            fine_resolution_minutes: DEFAULT_FINE_RESOLUTION_MINUTES,
            default_min_elevation: 10.0,
            default_hours: 24,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Configured sources, or the public defaults when none are listed.
    pub fn sources(&self) -> Vec<SourceConfig> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }

    pub fn default_observer(&self) -> Result<Option<Observer>, PredictError> {
        self.observer
            .as_ref()
            .map(|o| Observer::from_coordinates(&o.coordinates, Some(o.altitude_m)))
            .transpose()
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            ttl: chrono::Duration::from_std(self.cache.ttl)
                .unwrap_or_else(|_| CacheSettings::default().ttl),
            max_entries: self.cache.max_entries,
            eviction_batch: self.cache.eviction_batch,
        }
    }

    pub fn search_settings(&self) -> SearchSettings {
        SearchSettings {
            samples_per_orbit: self.search.samples_per_orbit,
            hysteresis_deg: self.search.hysteresis_deg,
            ..SearchSettings::default()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: String| Err(ConfigError::Invalid { field, message });

        if self.cache.max_entries == 0 {
            return invalid("cache.max_entries", "must be at least 1".into());
        }
        if self.search.samples_per_orbit < crate::predict::MIN_SAMPLES_PER_ORBIT {
            return invalid(
                "search.samples_per_orbit",
                format!(
                    "must be at least {}, got {}",
                    crate::predict::MIN_SAMPLES_PER_ORBIT,
                    self.search.samples_per_orbit
                ),
            );
        }
        if let Some(source) = self.sources.iter().find(|s| !s.url.contains("{catalog_id}")) {
            return invalid(
                "sources",
                format!("{}: url has no {{catalog_id}} placeholder", source.name),
            );
        }
        if let Err(e) = self.default_observer() {
            return invalid("observer", e.to_string());
        }
        Ok(())
    }
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
