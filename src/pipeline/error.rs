//! Run-level error taxonomy.
//!
//! Every failure aborts the run before anything is persisted: the catalog
//! on disk is the single source of truth for downstream consumers, and a
//! stale catalog is strictly better than a half-updated one. Merge
//! ambiguity has no error class at all — every merge rule is a total
//! function.

use thiserror::Error;

use crate::{config::ConfigError, enrich::EnrichmentError, sources::SourceError, store::StoreError};

/// Fatal run failure, surfaced to the user with the failing stage (and
/// model id where one applies).
#[derive(Debug, Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("source '{source_id}' failed: {source}")]
    Source {
        source_id: &'static str,
        #[source]
        source: SourceError,
    },

    #[error("enrichment step '{step}' failed for model '{model_id}': {source}")]
    ModelEnrichment {
        step: &'static str,
        model_id: String,
        #[source]
        source: EnrichmentError,
    },

    #[error("batch enrichment step '{step}' failed: {source}")]
    BatchEnrichment {
        step: &'static str,
        #[source]
        source: EnrichmentError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
