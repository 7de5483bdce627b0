use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex as GateMutex;

use crate::elements::error::{ElementsError, SourceError};
use crate::elements::parsing::parse_element_set;
use crate::elements::source::{ElementSource, SourceRegistry};
use crate::elements::types::{CacheEntry, OrbitalElementSet};

pub const DEFAULT_TTL: Duration = Duration::hours(1);
pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_EVICTION_BATCH: usize = 10;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
    pub eviction_batch: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            eviction_batch: DEFAULT_EVICTION_BATCH,
        }
    }
}

/// In-process element store with TTL expiry and ordered source fallback.
///
/// Expired entries are only noticed on access. Misses for the same catalog
/// id are funnelled through a per-id gate so that a single fetch is in
/// flight; other ids are not held up by it.
pub struct ElementCache {
    registry: SourceRegistry,
    settings: CacheSettings,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<u32, CacheEntry>>,
    gates: StdMutex<HashMap<u32, Arc<GateMutex<()>>>>,
}

impl ElementCache {
    pub fn new(registry: SourceRegistry, settings: CacheSettings) -> Self {
        Self::with_clock(registry, settings, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: SourceRegistry,
        settings: CacheSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            settings,
            clock,
            entries: RwLock::new(HashMap::new()),
            gates: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn get_elements(&self, catalog_id: u32) -> Result<OrbitalElementSet, ElementsError> {
        Ok(self.get_entry(catalog_id).await?.elements)
    }

    /// Like [`get_elements`](Self::get_elements) but also returns the fetch
    /// metadata.
    pub async fn get_entry(&self, catalog_id: u32) -> Result<CacheEntry, ElementsError> {
        if catalog_id == 0 {
            return Err(ElementsError::InvalidCatalogId(catalog_id));
        }

        if let Some(entry) = self.live_entry(catalog_id) {
            log::debug!("Cache hit for {}", catalog_id);
            return Ok(entry);
        }

        let gate = self.gate(catalog_id);
        let result = {
            let _guard = gate.lock().await;
            // Someone else may have filled it while we waited.
            match self.live_entry(catalog_id) {
                Some(entry) => Ok(entry),
                None => self.refresh(catalog_id).await,
            }
        };
        self.release_gate(catalog_id, &gate);
        result
    }

    /// Current entry regardless of age, for inspection.
    pub fn entry(&self, catalog_id: u32) -> Option<CacheEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&catalog_id)
            .cloned()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, catalog_id: u32) -> Option<CacheEntry> {
        let now = self.clock.now();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&catalog_id)
            .filter(|entry| entry.is_live(now, self.settings.ttl))
            .cloned()
    }

    async fn refresh(&self, catalog_id: u32) -> Result<CacheEntry, ElementsError> {
        let mut failures = Vec::new();

        for source in self.registry.iter() {
            match self.fetch_from(source.as_ref(), catalog_id).await {
                Ok(entry) => {
                    self.insert(catalog_id, entry.clone());
                    return Ok(entry);
                }
                Err(e) => {
                    log::warn!(
                        "Source {} failed for catalog id {}: {}",
                        source.name(),
                        catalog_id,
                        e
                    );
                    failures.push((source.name().to_string(), e));
                }
            }
        }

        Err(ElementsError::DataUnavailable {
            catalog_id,
            failures,
        })
    }

    async fn fetch_from(
        &self,
        source: &dyn ElementSource,
        catalog_id: u32,
    ) -> Result<CacheEntry, SourceError> {
        let payload = source.fetch(catalog_id).await?;
        let parsed = parse_element_set(&payload, catalog_id)?;

        if let Some(mismatch) = parsed.mismatch {
            log::warn!("Source {}: {}", source.name(), mismatch);
        }
        log::info!(
            "Fetched elements for {} ({}) from {}",
            catalog_id,
            parsed.elements.name,
            source.name()
        );

        Ok(CacheEntry {
            elements: parsed.elements,
            fetched_at: self.clock.now(),
            source: source.name().to_string(),
            mismatch: parsed.mismatch,
        })
    }

    fn insert(&self, catalog_id: u32, entry: CacheEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        if !entries.contains_key(&catalog_id) && entries.len() >= self.settings.max_entries {
            let mut by_age: Vec<(u32, DateTime<Utc>)> =
                entries.iter().map(|(id, e)| (*id, e.fetched_at)).collect();
            by_age.sort_by_key(|(_, fetched_at)| *fetched_at);

            let count = self.settings.eviction_batch.max(1);
            for (id, _) in by_age.into_iter().take(count) {
                entries.remove(&id);
            }
            log::debug!("Evicted up to {} cache entries, {} left", count, entries.len());
        }

        entries.insert(catalog_id, entry);
    }

    fn gate(&self, catalog_id: u32) -> Arc<GateMutex<()>> {
        self.gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(catalog_id)
            .or_default()
            .clone()
    }

    fn release_gate(&self, catalog_id: u32, gate: &Arc<GateMutex<()>>) {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by us: nobody else is waiting.
        if Arc::strong_count(gate) <= 2 {
            if let Some(current) = gates.get(&catalog_id) {
                if Arc::ptr_eq(current, gate) {
                    gates.remove(&catalog_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::parsing::tests::{iss_payload, ISS_LINE1, ISS_LINE2};
    use crate::elements::source::tests::ScriptedSource;

    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Arc<Self> {
            let start = DateTime::parse_from_rfc3339("2020-07-13T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc);
            Arc::new(Self(StdMutex::new(start)))
        }

        fn advance(&self, by: Duration) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn cache_with(
        sources: Vec<Arc<ScriptedSource>>,
        settings: CacheSettings,
        clock: Arc<ManualClock>,
    ) -> ElementCache {
        let registry = SourceRegistry::new(
            sources
                .into_iter()
                .map(|s| s as Arc<dyn ElementSource>)
                .collect(),
        );
        ElementCache::with_clock(registry, settings, clock)
    }

    #[tokio::test]
    async fn repeated_lookups_within_ttl_hit_the_cache() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let cache = cache_with(vec![source.clone()], CacheSettings::default(), ManualClock::new());

        let first = cache.get_elements(25544).await.unwrap();
        let second = cache.get_elements(25544).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.line1, ISS_LINE1);
        assert_eq!(first.line2, ISS_LINE2);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_fetched_once_more() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let clock = ManualClock::new();
        let cache = cache_with(vec![source.clone()], CacheSettings::default(), clock.clone());

        cache.get_elements(25544).await.unwrap();
        clock.advance(Duration::minutes(59));
        cache.get_elements(25544).await.unwrap();
        assert_eq!(source.calls(), 1);

        clock.advance(Duration::minutes(2));
        cache.get_elements(25544).await.unwrap();
        cache.get_elements(25544).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn falls_back_to_the_next_source() {
        let broken = ScriptedSource::failing("broken");
        let garbage = ScriptedSource::ok("garbage", "<html>rate limited</html>".into());
        let backup = ScriptedSource::ok("backup", iss_payload());
        let cache = cache_with(
            vec![broken.clone(), garbage.clone(), backup.clone()],
            CacheSettings::default(),
            ManualClock::new(),
        );

        let elements = cache.get_elements(25544).await.unwrap();
        assert_eq!(elements.catalog_id, 25544);

        let entry = cache.entry(25544).unwrap();
        assert_eq!(entry.source, "backup");
        assert_eq!(broken.calls(), 1);
        assert_eq!(garbage.calls(), 1);
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test]
    async fn all_sources_failing_leaves_no_entry() {
        let cache = cache_with(
            vec![ScriptedSource::failing("a"), ScriptedSource::failing("b")],
            CacheSettings::default(),
            ManualClock::new(),
        );

        let err = cache.get_elements(25544).await.unwrap_err();
        match err {
            ElementsError::DataUnavailable {
                catalog_id,
                failures,
            } => {
                assert_eq!(catalog_id, 25544);
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].0, "a");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(cache.entry(25544).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn mismatched_id_is_kept_with_a_warning() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let cache = cache_with(vec![source], CacheSettings::default(), ManualClock::new());

        let elements = cache.get_elements(40000).await.unwrap();
        assert_eq!(elements.catalog_id, 25544);
        let mismatch = cache.entry(40000).unwrap().mismatch.unwrap();
        assert_eq!(mismatch.requested, 40000);
        assert_eq!(mismatch.embedded, 25544);
    }

    #[tokio::test]
    async fn full_cache_evicts_oldest_batch() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let clock = ManualClock::new();
        let settings = CacheSettings {
            ttl: Duration::hours(1),
            max_entries: 5,
            eviction_batch: 2,
        };
        let cache = cache_with(vec![source.clone()], settings, clock.clone());

        for id in 1..=5 {
            cache.get_elements(id).await.unwrap();
            clock.advance(Duration::seconds(1));
        }
        assert_eq!(cache.len(), 5);

        cache.get_elements(6).await.unwrap();
        assert_eq!(cache.len(), 4);
        assert!(cache.entry(1).is_none());
        assert!(cache.entry(2).is_none());
        assert!(cache.entry(3).is_some());
        assert!(cache.entry(6).is_some());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let cache = Arc::new(cache_with(
            vec![source.clone()],
            CacheSettings::default(),
            ManualClock::new(),
        ));

        let lookups: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_elements(25544).await })
            })
            .collect();
        for lookup in lookups {
            lookup.await.unwrap().unwrap();
        }

        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn rejects_catalog_id_zero() {
        let source = ScriptedSource::ok("primary", iss_payload());
        let cache = cache_with(vec![source.clone()], CacheSettings::default(), ManualClock::new());
        assert!(matches!(
            cache.get_elements(0).await,
            Err(ElementsError::InvalidCatalogId(0))
        ));
        assert_eq!(source.calls(), 0);
    }
}
