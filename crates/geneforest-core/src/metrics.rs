use anyhow::Result;
use once_cell::sync::OnceCell;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{KeyValue, global};
use tracing::info;

struct CacheMetrics {
    writes: Counter<u64>,
    search_scanned: Histogram<u64>,
    search_matches: Counter<u64>,
    retrieval_misses: Counter<u64>,
}

static METRICS: OnceCell<CacheMetrics> = OnceCell::new();

fn handles() -> &'static CacheMetrics {
    METRICS.get_or_init(|| {
        let meter: Meter = global::meter("geneforest.cache");
        CacheMetrics {
            writes: meter
                .u64_counter("cache_writes_total")
                .with_description("Total cache records written by status")
                .init(),
            search_scanned: meter
                .u64_histogram("cache_search_scanned_records")
                .with_description("Records scanned per cache search")
                .init(),
            search_matches: meter
                .u64_counter("cache_search_matches_total")
                .with_description("Total cache search matches returned")
                .init(),
            retrieval_misses: meter
                .u64_counter("cache_retrieval_misses_total")
                .with_description("Requested identifiers that did not resolve")
                .init(),
        }
    })
}

/// Hint to operators that OTEL metrics export can be configured externally.
pub fn init_metrics_from_env(service_name: &str) -> Result<()> {
    if std::env::var("GENEFOREST_OTEL_METRICS_ENDPOINT").is_ok() {
        info!(
            target = "telemetry",
            "GENEFOREST_OTEL_METRICS_ENDPOINT detected for {service_name}. Configure an OTLP meter provider in your deployment to export cache metrics."
        );
    }
    Ok(())
}

/// No-op placeholder for symmetry with tracer shutdown.
pub fn shutdown_metrics() {}

pub(crate) fn record_cache_write(status: &str) {
    let metrics = handles();
    metrics
        .writes
        .add(1, &[KeyValue::new("status", status.to_string())]);
}

pub(crate) fn record_cache_search(scanned: usize, matched: usize) {
    let metrics = handles();
    metrics.search_scanned.record(scanned as u64, &[]);
    metrics.search_matches.add(matched as u64, &[]);
}

pub(crate) fn record_retrieval_miss() {
    handles().retrieval_misses.add(1, &[]);
}
