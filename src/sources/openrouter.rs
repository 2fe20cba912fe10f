//! OpenRouter model listing adapter.
//!
//! Maps `GET /api/v1/models` responses onto canonical records. OpenRouter
//! quotes prices in dollars per token as decimal strings; they are scaled
//! to per-million here without ever passing through a float.

use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{ModelSource, SourceError, fetch_text};
use crate::{
    catalog::{
        CanonicalModel, InputModality, OfferingPrice, OutputModality, ProviderOffering,
        TransientIdFilter, TriState, canonical_id,
    },
    config::OpenRouterSourceConfig,
};

const PROVIDER_ID: &str = "openrouter";
const PROVIDER_NAME: &str = "OpenRouter";
const TOKENS_PER_MILLION: u64 = 1_000_000;

/// Response envelope for the model listing.
#[derive(Debug, Deserialize)]
struct ListResponse {
    data: Vec<RawModel>,
}

#[derive(Debug, Deserialize)]
struct RawModel {
    id: String,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    context_length: Option<u64>,

    #[serde(default)]
    architecture: RawArchitecture,

    #[serde(default)]
    pricing: Option<RawPricing>,

    #[serde(default)]
    top_provider: Option<RawTopProvider>,

    #[serde(default)]
    supported_parameters: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawArchitecture {
    #[serde(default)]
    input_modalities: Vec<String>,

    #[serde(default)]
    output_modalities: Vec<String>,
}

/// Dollars per token, as decimal strings (e.g. "0.000002").
#[derive(Debug, Deserialize)]
struct RawPricing {
    #[serde(default)]
    prompt: Option<String>,

    #[serde(default)]
    completion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTopProvider {
    #[serde(default)]
    context_length: Option<u64>,

    #[serde(default)]
    max_completion_tokens: Option<u64>,
}

pub struct OpenRouterSource {
    api_url: String,
    timeout: std::time::Duration,
    filter: TransientIdFilter,
}

impl OpenRouterSource {
    pub fn new(config: &OpenRouterSourceConfig, filter: TransientIdFilter) -> Self {
        Self {
            api_url: config.api_url.clone(),
            timeout: std::time::Duration::from_secs(config.timeout_secs),
            filter,
        }
    }
}

#[async_trait]
impl ModelSource for OpenRouterSource {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(&self) -> Result<Vec<CanonicalModel>, SourceError> {
        let body = fetch_text(&self.api_url, self.timeout).await?;
        parse_models(&body, self.filter)
    }
}

/// Parse and map a listing payload. Transient ids are dropped; everything
/// else maps to one record with a single OpenRouter offering.
fn parse_models(body: &str, filter: TransientIdFilter) -> Result<Vec<CanonicalModel>, SourceError> {
    let response: ListResponse = serde_json::from_str(body)?;

    let mut models = Vec::with_capacity(response.data.len());
    for raw in response.data {
        if filter.matches(&raw.id) {
            continue;
        }
        models.push(map_model(raw)?);
    }
    Ok(models)
}

fn map_model(raw: RawModel) -> Result<CanonicalModel, SourceError> {
    let id = canonical_id(&raw.id).to_string();

    let mut model = CanonicalModel::new(id);
    if raw.id != model.id {
        model.aliases.push(raw.id.clone());
    }
    model.name = raw.name;
    model.description = raw.description;

    for tag in &raw.architecture.input_modalities {
        if let Some(modality) = InputModality::parse(tag) {
            model.input_modalities.insert(modality);
        }
    }
    for tag in &raw.architecture.output_modalities {
        if let Some(modality) = OutputModality::parse(tag) {
            model.output_modalities.insert(modality);
        }
    }

    model.parameters = raw.supported_parameters.iter().cloned().collect();
    // The parameter list is authoritative for what the router accepts, but
    // absence of a capability parameter is not a definite "no" from the
    // underlying model, so only positive signals are recorded.
    if model.parameters.contains("reasoning") || model.parameters.contains("include_reasoning") {
        model.reasoning = TriState::True;
    }
    if model.parameters.contains("tools") {
        model.tool_calling = TriState::True;
    }

    let top = raw.top_provider.as_ref();
    model.providers = vec![ProviderOffering {
        provider_id: PROVIDER_ID.to_string(),
        provider_name: Some(PROVIDER_NAME.to_string()),
        context_length: top.and_then(|t| t.context_length).or(raw.context_length),
        input_limit: None,
        output_limit: top.and_then(|t| t.max_completion_tokens),
        price: raw.pricing.map(|p| map_pricing(&raw.id, p)).transpose()?,
    }];

    Ok(model)
}

fn map_pricing(model_id: &str, pricing: RawPricing) -> Result<OfferingPrice, SourceError> {
    Ok(OfferingPrice {
        currency: "usd".to_string(),
        input: per_million(model_id, "prompt", pricing.prompt)?,
        output: per_million(model_id, "completion", pricing.completion)?,
    })
}

/// Scale a dollars-per-token decimal string to dollars per million tokens.
fn per_million(
    model_id: &str,
    field: &str,
    value: Option<String>,
) -> Result<Option<Decimal>, SourceError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let per_token = Decimal::from_str(&value).map_err(|e| {
        SourceError::Invalid(format!("model {model_id}: bad {field} price '{value}': {e}"))
    })?;
    Ok(Some(
        (per_token * Decimal::from(TOKENS_PER_MILLION)).normalize(),
    ))
}
