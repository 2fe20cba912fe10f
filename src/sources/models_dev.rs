//! models.dev catalog adapter.
//!
//! The models.dev API returns a single JSON document keyed by provider id,
//! each provider carrying a map of models with capability flags, limits,
//! knowledge cutoffs, and USD costs per million tokens. One canonical
//! record is emitted per (provider, model) pair.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{ModelSource, SourceError, fetch_text};
use crate::{
    catalog::{
        CanonicalModel, InputModality, OfferingPrice, OutputModality, ProviderOffering,
        TransientIdFilter, canonical_id,
    },
    config::ModelsDevSourceConfig,
};

/// The catalog document: provider id → provider definition.
type RawCatalog = HashMap<String, RawProvider>;

#[derive(Debug, Deserialize)]
struct RawProvider {
    /// Human-readable provider name.
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    models: HashMap<String, RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    id: String,

    #[serde(default)]
    name: Option<String>,

    /// Whether the model accepts file attachments.
    #[serde(default)]
    attachment: bool,

    /// The catalog schema defaults these to false when omitted, so they
    /// map to known values rather than unknown.
    #[serde(default)]
    reasoning: bool,

    #[serde(default)]
    tool_call: bool,

    #[serde(default)]
    open_weights: bool,

    /// Knowledge cutoff, `YYYY-MM` or `YYYY-MM-DD`.
    #[serde(default)]
    knowledge: Option<String>,

    #[serde(default)]
    modalities: RawModalities,

    #[serde(default)]
    cost: RawCost,

    #[serde(default)]
    limit: RawLimit,
}

#[derive(Debug, Default, Deserialize)]
struct RawModalities {
    #[serde(default)]
    input: Vec<String>,

    #[serde(default)]
    output: Vec<String>,
}

/// Dollars per 1M tokens.
#[derive(Debug, Default, Deserialize)]
struct RawCost {
    #[serde(default)]
    input: Option<Decimal>,

    #[serde(default)]
    output: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct RawLimit {
    #[serde(default)]
    context: Option<u64>,

    #[serde(default)]
    output: Option<u64>,
}

pub struct ModelsDevSource {
    api_url: String,
    timeout: std::time::Duration,
    filter: TransientIdFilter,
}

impl ModelsDevSource {
    pub fn new(config: &ModelsDevSourceConfig, filter: TransientIdFilter) -> Self {
        Self {
            api_url: config.api_url.clone(),
            timeout: std::time::Duration::from_secs(config.timeout_secs),
            filter,
        }
    }
}

#[async_trait]
impl ModelSource for ModelsDevSource {
    fn id(&self) -> &'static str {
        "models_dev"
    }

    async fn fetch(&self) -> Result<Vec<CanonicalModel>, SourceError> {
        let body = fetch_text(&self.api_url, self.timeout).await?;
        parse_catalog(&body, self.filter)
    }
}

fn parse_catalog(body: &str, filter: TransientIdFilter) -> Result<Vec<CanonicalModel>, SourceError> {
    let catalog: RawCatalog = serde_json::from_str(body)?;

    // Provider map iteration order is unspecified; sort so a run's record
    // order (and with it every first-wins tie-break) is reproducible.
    let mut providers: Vec<(String, RawProvider)> = catalog.into_iter().collect();
    providers.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut models = Vec::new();
    for (provider_id, provider) in providers {
        let mut raw_models: Vec<RawModel> = provider.models.into_values().collect();
        raw_models.sort_by(|a, b| a.id.cmp(&b.id));

        for raw in raw_models {
            if filter.matches(&raw.id) {
                continue;
            }
            models.push(map_model(&provider_id, provider.name.as_deref(), raw));
        }
    }
    Ok(models)
}

fn map_model(provider_id: &str, provider_name: Option<&str>, raw: RawModel) -> CanonicalModel {
    let id = canonical_id(&raw.id).to_string();

    let mut model = CanonicalModel::new(id);
    if raw.id != model.id {
        model.aliases.push(raw.id.clone());
    }
    model.name = raw.name;
    model.reasoning = raw.reasoning.into();
    model.tool_calling = raw.tool_call.into();
    model.open_weights = raw.open_weights.into();
    model.knowledge = raw.knowledge;

    for tag in &raw.modalities.input {
        if let Some(modality) = InputModality::parse(tag) {
            model.input_modalities.insert(modality);
        }
    }
    for tag in &raw.modalities.output {
        if let Some(modality) = OutputModality::parse(tag) {
            model.output_modalities.insert(modality);
        }
    }
    if raw.attachment {
        model.input_modalities.insert(InputModality::File);
    }

    let price = match (raw.cost.input, raw.cost.output) {
        (None, None) => None,
        (input, output) => Some(OfferingPrice {
            currency: "usd".to_string(),
            input,
            output,
        }),
    };

    model.providers = vec![ProviderOffering {
        provider_id: provider_id.to_string(),
        provider_name: provider_name.map(str::to_string),
        context_length: raw.limit.context,
        input_limit: None,
        output_limit: raw.limit.output,
        price,
    }];

    model
}
