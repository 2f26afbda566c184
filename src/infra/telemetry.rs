use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    // stderr keeps stdout free for command output
    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "tagflush_tags_flushed_total",
            Unit::Count,
            "Total number of cache tags handed to the cache sink."
        );
        describe_counter!(
            "tagflush_entries_removed_total",
            Unit::Count,
            "Total number of cache entries removed by tag flushes."
        );
        describe_counter!(
            "tagflush_flush_failures_total",
            Unit::Count,
            "Total number of tag flushes that failed."
        );
        describe_counter!(
            "tagflush_render_contexts_created_total",
            Unit::Count,
            "Total number of render contexts built for asset lookups."
        );
        describe_counter!(
            "tagflush_store_evict_total",
            Unit::Count,
            "Total number of in-memory cache entries evicted due to capacity."
        );
        describe_histogram!(
            "tagflush_commit_ms",
            Unit::Milliseconds,
            "Commit latency in milliseconds."
        );
    });
}
