//! Source adapters: fetch provider JSON and emit canonical records.
//!
//! Each adapter returns [`CanonicalModel`] records with exactly one
//! [`ProviderOffering`] populated, ids already normalized, and transient
//! ids filtered via the injected predicate. Unparseable upstream payloads
//! are fatal: an adapter raises [`SourceError`] rather than silently
//! dropping data.

mod models_dev;
mod openrouter;

use async_trait::async_trait;
pub use models_dev::ModelsDevSource;
pub use openrouter::OpenRouterSource;
use thiserror::Error;

use crate::{
    catalog::{CanonicalModel, TransientIdFilter},
    config::{ConfigError, RunConfig},
};

/// Failure fetching or validating upstream data. Always fatal for the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("unparseable payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// A model metadata source.
#[async_trait]
pub trait ModelSource: Send + Sync {
    /// Stable source id, also used in `sources.order` configuration.
    fn id(&self) -> &'static str;

    /// Fetch and map the source's models.
    async fn fetch(&self) -> Result<Vec<CanonicalModel>, SourceError>;
}

/// Build the enabled adapters in configured fetch order.
///
/// The returned order is the dedup precedence order: the first source to
/// mention an attribute wins its "first wins" tie-breaks downstream.
pub fn from_config(
    config: &RunConfig,
    filter: TransientIdFilter,
) -> Result<Vec<Box<dyn ModelSource>>, ConfigError> {
    let mut sources: Vec<Box<dyn ModelSource>> = Vec::new();
    for id in &config.sources.order {
        match id.as_str() {
            "openrouter" => {
                if config.sources.openrouter.enabled {
                    sources.push(Box::new(OpenRouterSource::new(
                        &config.sources.openrouter,
                        filter,
                    )));
                }
            }
            "models_dev" => {
                if config.sources.models_dev.enabled {
                    sources.push(Box::new(ModelsDevSource::new(
                        &config.sources.models_dev,
                        filter,
                    )));
                }
            }
            other => {
                return Err(ConfigError::UnknownSource {
                    id: other.to_string(),
                });
            }
        }
    }
    Ok(sources)
}

/// Shared GET helper: status check, then the raw body for the adapter to
/// parse against its schema.
pub(crate) async fn fetch_text(
    url: &str,
    timeout: std::time::Duration,
) -> Result<String, SourceError> {
    let response = reqwest::Client::new()
        .get(url)
        .timeout(timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(SourceError::Status(response.status()));
    }
    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_respects_order_and_enablement() {
        let mut config = RunConfig::default();
        config.sources.order = vec!["models_dev".to_string(), "openrouter".to_string()];
        let sources = from_config(&config, TransientIdFilter::default()).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["models_dev", "openrouter"]);

        config.sources.openrouter.enabled = false;
        let sources = from_config(&config, TransientIdFilter::default()).unwrap();
        let ids: Vec<&str> = sources.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["models_dev"]);
    }

    #[test]
    fn test_from_config_rejects_unknown_source() {
        let mut config = RunConfig::default();
        config.sources.order = vec!["huggingface".to_string()];
        let err = match from_config(&config, TransientIdFilter::default()) {
            Ok(_) => panic!("expected an error for an unknown source"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("huggingface"));
    }
}
