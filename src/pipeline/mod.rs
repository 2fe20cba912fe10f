//! The aggregation pipeline: fetch, deduplicate, diff, enrich, persist.
//!
//! A run is a single batch pass. Sources are fetched sequentially in
//! configured order (that order is the dedup precedence order), the
//! concatenated records are deduplicated, the processor reconciles them
//! against the persisted catalog, the provider directory is rebuilt, and
//! only then — with the whole catalog assembled in memory — is anything
//! written back. Any failure along the way aborts before the write.

mod directory;
mod error;
mod hash;
mod processor;

use std::time::Instant;

use chrono::Utc;

pub use directory::{DirectoryEntry, ProviderDirectory, ProviderNameTable, rebuild_directory};
pub use error::RunError;
pub use hash::content_hash;
pub use processor::{ProcessOutput, Processor, RunCounts};

use crate::{
    catalog::{TransientIdFilter, deduplicate},
    config::RunConfig,
    sources::{self, ModelSource},
    store::{FileStore, Snapshot},
};

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    /// Records fetched across all sources, before deduplication.
    pub fetched: usize,

    /// Models in the assembled catalog.
    pub model_count: usize,

    pub counts: RunCounts,

    /// False for dry runs, which assemble everything but skip the write.
    pub written: bool,

    pub duration_ms: u64,
}

/// Execute a full aggregation run with the configured sources.
pub async fn run(config: &RunConfig, dry_run: bool) -> Result<RunSummary, RunError> {
    let sources = sources::from_config(config, TransientIdFilter::default())?;
    run_with_sources(config, &sources, dry_run).await
}

/// Execute a run against an explicit source list (tests substitute stubs).
pub async fn run_with_sources(
    config: &RunConfig,
    sources: &[Box<dyn ModelSource>],
    dry_run: bool,
) -> Result<RunSummary, RunError> {
    let started = Instant::now();

    let store = FileStore::from_config(&config.store);
    let snapshot = store.load()?;

    let mut raw = Vec::new();
    for source in sources {
        let models = source
            .fetch()
            .await
            .map_err(|source_err| RunError::Source {
                source_id: source.id(),
                source: source_err,
            })?;
        tracing::info!(
            source = source.id(),
            record_count = models.len(),
            "Fetched source records"
        );
        raw.extend(models);
    }
    let fetched = raw.len();

    let candidates = deduplicate(raw);
    tracing::debug!(
        candidate_count = candidates.len(),
        "Deduplicated source records"
    );

    let processor = Processor::from_config(config);
    let output = processor
        .process(candidates, &snapshot.models, &snapshot.hashes, Utc::now())
        .await?;

    let directory = rebuild_directory(&output.models, &config.provider_names);

    let next = Snapshot {
        models: output.models,
        directory,
        hashes: output.hashes,
    };
    if !dry_run {
        store.save(&next)?;
    }

    let summary = RunSummary {
        fetched,
        model_count: next.models.len(),
        counts: output.counts,
        written: !dry_run,
        duration_ms: started.elapsed().as_millis() as u64,
    };

    tracing::info!(
        fetched = summary.fetched,
        model_count = summary.model_count,
        new_or_changed = summary.counts.new_or_changed,
        unchanged = summary.counts.unchanged,
        deprecated = summary.counts.deprecated,
        written = summary.written,
        duration_ms = summary.duration_ms,
        "Aggregation run complete"
    );

    Ok(summary)
}
