//! Enrichment steps applied to new or changed models.
//!
//! Two step shapes exist, mirroring how they are dispatched:
//!
//! - [`ModelEnrichStep`] runs once per NEW_OR_CHANGED model, in configured
//!   order, each step seeing the previous step's output.
//! - [`BatchEnrichStep`] runs once over the whole NEW_OR_CHANGED set after
//!   every per-model chain has finished, for work that is cheaper in bulk
//!   (one translation request for many texts).
//!
//! Steps are side-effect-free with respect to the core's state: they take a
//! work-in-progress record and return an updated one. Any failure aborts
//! the entire run before the catalog is written.

mod cache;
mod currency;
mod description;
mod translate;

use async_trait::async_trait;
use thiserror::Error;

pub use cache::TranslationCache;
pub use currency::CurrencyNormalize;
pub use description::DescriptionCarry;
pub use translate::{TranslateDescriptions, localized_description};

use crate::{catalog::CanonicalModel, config::RunConfig};

/// Failure inside an enrichment step. Always fatal for the run.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EnrichmentError {
    message: String,
}

impl EnrichmentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Inputs available to a per-model step besides the work-in-progress
/// record itself.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    /// The freshly deduplicated source record for this model.
    pub source: &'a CanonicalModel,

    /// The record persisted by the previous run, if the model was known.
    pub previous: Option<&'a CanonicalModel>,

    /// The run configuration.
    pub config: &'a RunConfig,
}

/// A per-model enrichment step.
#[async_trait]
pub trait ModelEnrichStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transform the work-in-progress record.
    async fn apply(
        &self,
        ctx: StepContext<'_>,
        wip: CanonicalModel,
    ) -> Result<CanonicalModel, EnrichmentError>;
}

/// A batch enrichment step over the full NEW_OR_CHANGED set.
#[async_trait]
pub trait BatchEnrichStep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Transform the whole batch. Must return one record per input record.
    async fn apply(
        &self,
        models: Vec<CanonicalModel>,
        config: &RunConfig,
    ) -> Result<Vec<CanonicalModel>, EnrichmentError>;
}

/// Heavy per-model steps for NEW_OR_CHANGED models, in execution order.
pub fn model_steps(config: &RunConfig) -> Vec<Box<dyn ModelEnrichStep>> {
    let mut steps: Vec<Box<dyn ModelEnrichStep>> = vec![Box::new(DescriptionCarry)];
    if config.enrich.currency.enabled {
        steps.push(Box::new(CurrencyNormalize));
    }
    steps
}

/// Lightweight steps for UNCHANGED models. Empty unless pricing refresh is
/// configured, in which case the prior record is repriced against the
/// current rate table instead of being reused verbatim.
pub fn lightweight_steps(config: &RunConfig) -> Vec<Box<dyn ModelEnrichStep>> {
    if config.enrich.currency.enabled && config.enrich.refresh_pricing {
        vec![Box::new(CurrencyNormalize)]
    } else {
        Vec::new()
    }
}

/// Batch steps over the NEW_OR_CHANGED set, in execution order.
pub fn batch_steps(config: &RunConfig) -> Vec<Box<dyn BatchEnrichStep>> {
    if config.enrich.translation.enabled {
        vec![Box::new(TranslateDescriptions::from_config(
            &config.enrich.translation,
        ))]
    } else {
        Vec::new()
    }
}
