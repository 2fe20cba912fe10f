//! Content hashing for change detection.
//!
//! A model's hash covers only the fields sourced directly from providers,
//! serialized in a canonical form (aliases sorted, providers sorted by
//! provider id). Derived fields — translated descriptions, deprecation,
//! import timestamps — are excluded so enrichment output never triggers
//! re-enrichment.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::catalog::{
    CanonicalModel, InputModality, OutputModality, ProviderOffering, TriState,
};

/// Canonical view of the source-derived fields of a model.
#[derive(Serialize)]
struct HashedFields<'a> {
    id: &'a str,
    aliases: Vec<&'a str>,
    name: &'a Option<String>,
    description: &'a Option<String>,
    input_modalities: &'a BTreeSet<InputModality>,
    output_modalities: &'a BTreeSet<OutputModality>,
    reasoning: TriState,
    tool_calling: TriState,
    open_weights: TriState,
    knowledge: &'a Option<String>,
    parameters: &'a BTreeSet<String>,
    default_parameters: &'a BTreeMap<String, serde_json::Value>,
    providers: Vec<&'a ProviderOffering>,
    free_providers: Vec<&'a ProviderOffering>,
}

impl<'a> HashedFields<'a> {
    fn new(model: &'a CanonicalModel) -> Self {
        let mut aliases: Vec<&str> = model.aliases.iter().map(String::as_str).collect();
        aliases.sort_unstable();

        let sorted_offerings = |offerings: &'a [ProviderOffering]| {
            let mut sorted: Vec<&ProviderOffering> = offerings.iter().collect();
            sorted.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
            sorted
        };

        Self {
            id: &model.id,
            aliases,
            name: &model.name,
            description: &model.description,
            input_modalities: &model.input_modalities,
            output_modalities: &model.output_modalities,
            reasoning: model.reasoning,
            tool_calling: model.tool_calling,
            open_weights: model.open_weights,
            knowledge: &model.knowledge,
            parameters: &model.parameters,
            default_parameters: &model.default_parameters,
            providers: sorted_offerings(&model.providers),
            free_providers: sorted_offerings(&model.free_providers),
        }
    }
}

/// SHA-256 over the canonicalized serialization of the source-derived
/// fields, hex-encoded.
pub fn content_hash(model: &CanonicalModel) -> String {
    let view = HashedFields::new(model);
    // Serializing a plain struct of in-memory values cannot fail.
    let bytes = serde_json::to_vec(&view).expect("canonical view serializes");
    hex::encode(Sha256::digest(&bytes))
}
