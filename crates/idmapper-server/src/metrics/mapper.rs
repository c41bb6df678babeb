//! Mapper lookup and reload metrics.

use metrics::{counter, gauge, histogram};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Describe las metricas de los mappers.
/// Llamar una vez al inicio.
pub fn register_mapper_metrics() {
    metrics::describe_counter!(
        "idmapper_lookups_total",
        "Total number of ID lookups by result (hit, miss)"
    );
    metrics::describe_counter!(
        "idmapper_reloads_total",
        "Total number of mapper reloads by result (success, failure)"
    );
    metrics::describe_gauge!(
        "idmapper_entries",
        "Number of entries in the current snapshot"
    );
    metrics::describe_histogram!(
        "idmapper_reload_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent fetching and installing a snapshot"
    );
}

/// Metricas de un mapper.
///
/// Los contadores internos alimentan el endpoint de estado; los macros de
/// `metrics` alimentan Prometheus.
#[derive(Debug)]
pub struct MapperMetrics {
    mapper: String,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MapperMetrics {
    pub fn new(mapper: impl Into<String>) -> Self {
        Self {
            mapper: mapper.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Registra un lookup
    pub fn record_lookup(&self, found: bool) {
        let result = if found {
            self.hits.fetch_add(1, Ordering::Relaxed);
            "hit"
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            "miss"
        };

        counter!(
            "idmapper_lookups_total",
            "mapper" => self.mapper.clone(),
            "result" => result
        )
        .increment(1);
    }

    /// Registra el resultado de un reload
    pub fn record_reload(&self, success: bool, duration: Duration) {
        let result = if success { "success" } else { "failure" };

        counter!(
            "idmapper_reloads_total",
            "mapper" => self.mapper.clone(),
            "result" => result
        )
        .increment(1);

        histogram!(
            "idmapper_reload_duration_seconds",
            "mapper" => self.mapper.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Actualiza el gauge de entries
    pub fn set_entries(&self, entries: usize) {
        gauge!("idmapper_entries", "mapper" => self.mapper.clone()).set(entries as f64);
    }

    /// Fraccion de lookups que encontraron el ID
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}
