//! Mapper registry.
//!
//! Builds one cache per configured mapper and drives their periodic reloads
//! from a single scheduler. Reloads of different mappers never overlap: every
//! reload, scheduled or requested over HTTP, takes the registry's reload lock.
//! Lookups never take it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use idmapper_core::{
    ActorCache, CacheError, MappingCache, MemorySource, ReloadStatus, Snapshot, SnapshotCache,
    SnapshotSource, SourceError,
};
use idmapper_scheduler::{Job, Scheduler};
use idmapper_sources::{FileSource, HttpSource, PgSource, RedisSource};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::RegistryError;
use crate::metrics::MapperMetrics;
use crate::settings::{CacheKind, MapperSettings, SourceSettings};

/// A named cache plus its reload schedule.
pub struct Mapper {
    name: String,
    cache: Arc<dyn MappingCache>,
    interval: Duration,
    reload_lock: Arc<Mutex<()>>,
    metrics: MapperMetrics,
}

/// Lookup counters reported next to the reload status.
#[derive(Debug, Clone, Serialize)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// Status of one mapper as served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct MapperStatus {
    #[serde(flatten)]
    pub reload: ReloadStatus,
    pub interval_secs: u64,
    pub lookups: LookupStats,
}

impl Mapper {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Looks up `id`.
    pub async fn get(&self, id: &str) -> Option<String> {
        let value = self.cache.get(id).await;
        self.metrics.record_lookup(value.is_some());
        value
    }

    /// Reloads the cache under the registry's reload lock.
    pub async fn reload(&self) -> Result<(), CacheError> {
        let _guard = self.reload_lock.lock().await;

        let start = Instant::now();
        let result = self.cache.reload().await;
        self.metrics.record_reload(result.is_ok(), start.elapsed());

        if result.is_ok() {
            self.metrics.set_entries(self.cache.status().entries);
        }

        result
    }

    pub fn status(&self) -> MapperStatus {
        MapperStatus {
            reload: self.cache.status(),
            interval_secs: self.interval.as_secs(),
            lookups: LookupStats {
                hits: self.metrics.hits(),
                misses: self.metrics.misses(),
                hit_rate: self.metrics.hit_rate(),
            },
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.cache.status().healthy
    }
}

impl std::fmt::Debug for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mapper")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .finish()
    }
}

/// Scheduled reload of one mapper.
struct ReloadJob {
    mapper: Arc<Mapper>,
}

#[async_trait]
impl Job for ReloadJob {
    async fn run(&self) {
        match self.mapper.reload().await {
            Ok(()) => info!(mapper = %self.mapper.name, "Reload of mapper was successful"),
            Err(e) => warn!(
                mapper = %self.mapper.name,
                error = %e,
                "Reload of mapper failed, keeping previous data"
            ),
        }
    }

    fn name(&self) -> &str {
        &self.mapper.name
    }
}

/// All mappers of the service and the scheduler reloading them.
pub struct MapperRegistry {
    mappers: BTreeMap<String, Arc<Mapper>>,
    scheduler: Scheduler,
}

impl MapperRegistry {
    /// Builds every configured mapper, running each initial load in order.
    ///
    /// # Errors
    ///
    /// The first source that cannot be created or loaded aborts the build.
    pub async fn build(settings: &[MapperSettings]) -> Result<Self, RegistryError> {
        let mut caches = Vec::with_capacity(settings.len());

        for mapper in settings {
            let source = build_source(mapper).map_err(|source| RegistryError::Source {
                mapper: mapper.name.clone(),
                source,
            })?;

            let cache = build_cache(source, mapper.cache, mapper.fetch_timeout())
                .await
                .map_err(|source| RegistryError::Cache {
                    mapper: mapper.name.clone(),
                    source,
                })?;

            info!(
                mapper = %mapper.name,
                cache = ?mapper.cache,
                interval_secs = mapper.interval_secs,
                entries = cache.status().entries,
                "Mapper loaded"
            );
            caches.push((mapper.name.clone(), cache, mapper.interval()));
        }

        Self::from_caches(caches)
    }

    /// Builds a registry from ready caches.
    pub fn from_caches(
        caches: impl IntoIterator<Item = (String, Arc<dyn MappingCache>, Duration)>,
    ) -> Result<Self, RegistryError> {
        let reload_lock = Arc::new(Mutex::new(()));
        let scheduler = Scheduler::new();
        let mut mappers = BTreeMap::new();

        for (name, cache, interval) in caches {
            if mappers.contains_key(&name) {
                return Err(RegistryError::Duplicate(name));
            }

            let metrics = MapperMetrics::new(&name);
            metrics.set_entries(cache.status().entries);

            let mapper = Arc::new(Mapper {
                name: name.clone(),
                cache,
                interval,
                reload_lock: Arc::clone(&reload_lock),
                metrics,
            });

            scheduler.add(
                ReloadJob {
                    mapper: Arc::clone(&mapper),
                },
                interval,
            )?;
            mappers.insert(name, mapper);
        }

        Ok(Self { mappers, scheduler })
    }

    /// Returns the mapper called `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<Mapper>> {
        self.mappers.get(name)
    }

    /// Iterates the mappers ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Mapper>> {
        self.mappers.values()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }

    /// Status of every mapper, by name.
    pub fn statuses(&self) -> BTreeMap<String, MapperStatus> {
        self.mappers
            .iter()
            .map(|(name, mapper)| (name.clone(), mapper.status()))
            .collect()
    }

    /// True when the last reload of every mapper succeeded.
    pub fn is_healthy(&self) -> bool {
        self.mappers.values().all(|m| m.is_healthy())
    }

    /// Starts the periodic reloads.
    pub fn start_reloader(&self) {
        info!(mappers = self.mappers.len(), "Starting reloader");
        self.scheduler.start();
    }

    /// Stops the periodic reloads, waiting for one in progress to finish.
    pub async fn stop_reloader(&self) {
        self.scheduler.shutdown().await;
    }

    pub fn is_reloading(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stops the reloader and releases every cache's background resources.
    pub async fn shutdown(&self) {
        self.stop_reloader().await;
        for mapper in self.mappers.values() {
            mapper.cache.shutdown();
        }
        info!("Mappers shut down");
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperRegistry")
            .field("mappers", &self.mappers.keys().collect::<Vec<_>>())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Creates the data source described by `settings`.
pub fn build_source(settings: &MapperSettings) -> Result<Box<dyn SnapshotSource>, SourceError> {
    let name = settings.name.as_str();

    let source: Box<dyn SnapshotSource> = match &settings.source {
        SourceSettings::Http { url, timeout_ms } => Box::new(HttpSource::new(
            name,
            url.as_str(),
            Duration::from_millis(*timeout_ms),
        )?),
        SourceSettings::Pgsql {
            connection_string,
            query,
            table,
            timeout_ms,
        } => {
            let query = query
                .clone()
                .unwrap_or_else(|| PgSource::table_query(table.as_deref().unwrap_or(name)));
            Box::new(PgSource::new(
                name,
                connection_string,
                query,
                timeout_ms.map(Duration::from_millis),
            )?)
        },
        SourceSettings::Redis {
            addr,
            password,
            hash,
            timeout_ms,
        } => Box::new(RedisSource::new(
            name,
            addr,
            password.as_deref(),
            hash.as_deref().unwrap_or(name),
            timeout_ms.map(Duration::from_millis),
        )?),
        SourceSettings::File { path } => Box::new(FileSource::new(name, path.clone())?),
        SourceSettings::Static { values } => {
            Box::new(MemorySource::new(name, Snapshot::from(values.clone())))
        },
    };

    Ok(source)
}

/// Creates a cache of the given kind and runs its initial load.
pub async fn build_cache(
    source: Box<dyn SnapshotSource>,
    kind: CacheKind,
    fetch_timeout: Option<Duration>,
) -> Result<Arc<dyn MappingCache>, CacheError> {
    let cache: Arc<dyn MappingCache> = match (kind, fetch_timeout) {
        (CacheKind::Locked, None) => Arc::new(SnapshotCache::new(source).await?),
        (CacheKind::Locked, Some(timeout)) => {
            Arc::new(SnapshotCache::with_fetch_timeout(source, timeout).await?)
        },
        (CacheKind::Actor, None) => Arc::new(ActorCache::spawn(source).await?),
        (CacheKind::Actor, Some(timeout)) => {
            Arc::new(ActorCache::with_fetch_timeout(source, timeout).await?)
        },
    };

    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn static_mapper(name: &str, cache: CacheKind, values: &[(&str, &str)]) -> MapperSettings {
        MapperSettings {
            name: name.to_string(),
            interval_secs: 60,
            fetch_timeout_ms: None,
            cache,
            source: SourceSettings::Static {
                values: values
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect::<HashMap<_, _>>(),
            },
        }
    }

    #[tokio::test]
    async fn test_build_static_mappers() {
        let registry = MapperRegistry::build(&[
            static_mapper("currencies", CacheKind::Locked, &[("eur", "Euro")]),
            static_mapper("languages", CacheKind::Actor, &[("sk", "Slovak")]),
        ])
        .await
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.iter().map(|m| m.name()).collect::<Vec<_>>(),
            vec!["currencies", "languages"]
        );

        let currencies = registry.get("currencies").unwrap();
        assert_eq!(currencies.get("eur").await.as_deref(), Some("Euro"));
        assert_eq!(currencies.get("usd").await, None);

        let languages = registry.get("languages").unwrap();
        assert_eq!(languages.get("sk").await.as_deref(), Some("Slovak"));

        let status = currencies.status();
        assert_eq!(status.lookups.hits, 1);
        assert_eq!(status.lookups.misses, 1);
        assert!(registry.is_healthy());

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_fails_on_initial_load() {
        let mut mapper = static_mapper("countries", CacheKind::Locked, &[]);
        mapper.source = SourceSettings::File {
            path: "/nonexistent/countries.json".into(),
        };

        let err = MapperRegistry::build(&[mapper]).await.unwrap_err();
        assert!(matches!(err, RegistryError::Cache { ref mapper, .. } if mapper == "countries"));
    }

    #[tokio::test]
    async fn test_build_fails_on_invalid_source() {
        let mut mapper = static_mapper("languages", CacheKind::Locked, &[]);
        mapper.source = SourceSettings::Http {
            url: String::new(),
            timeout_ms: 1000,
        };

        let err = MapperRegistry::build(&[mapper]).await.unwrap_err();
        assert!(matches!(err, RegistryError::Source { .. }));
    }

    #[tokio::test]
    async fn test_redis_source_built_and_unreachable() {
        let mut mapper = static_mapper("currency", CacheKind::Locked, &[]);
        mapper.source = SourceSettings::Redis {
            addr: "127.0.0.1:1".to_string(),
            password: None,
            hash: None,
            timeout_ms: Some(2000),
        };

        let source = build_source(&mapper).unwrap();
        assert_eq!(source.name(), "currency");

        let err = MapperRegistry::build(&[mapper]).await.unwrap_err();
        assert!(matches!(err, RegistryError::Cache { ref mapper, .. } if mapper == "currency"));
    }

    #[tokio::test]
    async fn test_duplicate_names_rejected() {
        let a = build_cache(
            Box::new(MemorySource::new("a", Snapshot::new())),
            CacheKind::Locked,
            None,
        )
        .await
        .unwrap();

        let err = MapperRegistry::from_caches([
            ("a".to_string(), Arc::clone(&a), Duration::from_secs(1)),
            ("a".to_string(), a, Duration::from_secs(1)),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloader_refreshes_mappers() {
        let source = Arc::new(MemorySource::new(
            "countries",
            Snapshot::from_iter([("sk", "Slovakia")]),
        ));
        let cache: Arc<dyn MappingCache> =
            Arc::new(SnapshotCache::new(Arc::clone(&source)).await.unwrap());

        let registry = MapperRegistry::from_caches([(
            "countries".to_string(),
            cache,
            Duration::from_secs(60),
        )])
        .unwrap();

        registry.start_reloader();
        assert!(registry.is_reloading());

        source.set(Snapshot::from_iter([("sk", "Slovak Republic")]));
        tokio::time::sleep(Duration::from_secs(61)).await;

        let countries = registry.get("countries").unwrap();
        assert_eq!(countries.get("sk").await.as_deref(), Some("Slovak Republic"));
        assert_eq!(countries.status().reload.generation, 2);

        registry.shutdown().await;
        assert!(!registry.is_reloading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_scheduled_reload_keeps_data() {
        let source = Arc::new(MemorySource::new(
            "countries",
            Snapshot::from_iter([("sk", "Slovakia")]),
        ));
        let cache: Arc<dyn MappingCache> =
            Arc::new(SnapshotCache::new(Arc::clone(&source)).await.unwrap());
        let registry = MapperRegistry::from_caches([(
            "countries".to_string(),
            cache,
            Duration::from_secs(10),
        )])
        .unwrap();

        source.fail_with("connection refused");
        registry.start_reloader();
        tokio::time::sleep(Duration::from_secs(25)).await;

        let countries = registry.get("countries").unwrap();
        assert_eq!(countries.get("sk").await.as_deref(), Some("Slovakia"));
        assert_eq!(countries.status().reload.failure_count, 2);
        assert!(!registry.is_healthy());

        registry.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reloads_never_overlap() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut caches = vec![];
        for name in ["a", "b", "c"] {
            let (current, max) = (Arc::clone(&in_flight), Arc::clone(&peak));
            let source = idmapper_core::FnSource::new(name, move || {
                let (current, max) = (Arc::clone(&current), Arc::clone(&max));
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(300)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, SourceError>(Snapshot::from_iter([("k", "v")]))
                }
            });
            let cache: Arc<dyn MappingCache> = Arc::new(SnapshotCache::new(source).await.unwrap());
            caches.push((name.to_string(), cache, Duration::from_secs(1)));
        }

        // initial loads ran one after another
        peak.store(0, Ordering::SeqCst);

        let registry = MapperRegistry::from_caches(caches).unwrap();
        registry.start_reloader();
        tokio::time::sleep(Duration::from_millis(3500)).await;
        registry.shutdown().await;

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }
}
