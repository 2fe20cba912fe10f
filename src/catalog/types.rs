//! Type definitions for the canonical model catalog.
//!
//! These are the records the reconciliation core operates on: one
//! [`CanonicalModel`] per logical model, each owning the per-provider
//! [`ProviderOffering`]s that describe where it can be invoked and at what
//! price. Prices are carried as [`Decimal`] and serialized as decimal
//! strings so repeated load/store cycles never accumulate floating-point
//! drift.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One provider's view of one model.
///
/// An offering is owned exclusively by the canonical model it is attached
/// to; it is never shared across models.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderOffering {
    /// Stable short provider code (e.g., "openrouter", "mistral").
    pub provider_id: String,

    /// Human-readable provider label, when the source exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,

    /// Maximum context window in tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,

    /// Maximum input tokens, when stated separately from the context window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_limit: Option<u64>,

    /// Maximum output tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_limit: Option<u64>,

    /// Token pricing, when the source publishes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<OfferingPrice>,
}

/// Per-million-token pricing for an offering.
///
/// The currency is fixed at merge time; offerings quoting different
/// currencies are never merged into one offering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingPrice {
    /// ISO 4217 currency code, lowercase (e.g., "usd").
    pub currency: String,

    /// Input price per 1M tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::str_option"
    )]
    pub input: Option<Decimal>,

    /// Output price per 1M tokens.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::str_option"
    )]
    pub output: Option<Decimal>,
}

/// A capability flag that is known-true, known-false, or not yet reported
/// by any source.
///
/// Serialized as JSON `true` / `false` / `null` so an absent flag is never
/// silently read back as `false`. Under merge, `False` is sticky: once any
/// source reports false, the merged value stays false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    /// Merge another observation into this one.
    ///
    /// False wins over everything; otherwise the first known value wins and
    /// unknown stays unknown until a known value arrives.
    pub fn merge(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, _) => TriState::True,
            (TriState::Unknown, known) => known,
        }
    }

    pub fn is_known(self) -> bool {
        self != TriState::Unknown
    }
}

impl From<Option<bool>> for TriState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => TriState::True,
            Some(false) => TriState::False,
            None => TriState::Unknown,
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { TriState::True } else { TriState::False }
    }
}

impl Serialize for TriState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            TriState::True => serializer.serialize_bool(true),
            TriState::False => serializer.serialize_bool(false),
            TriState::Unknown => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for TriState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(Option::<bool>::deserialize(deserializer)?.into())
    }
}

/// Input modalities a model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputModality {
    Text,
    Image,
    File,
    Audio,
    Video,
}

impl InputModality {
    /// Map a source-supplied modality tag onto the closed set.
    ///
    /// Unknown tags return `None` and are dropped by adapters; "pdf" and
    /// "document" fold into [`InputModality::File`].
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "file" | "pdf" | "document" => Some(Self::File),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            _ => None,
        }
    }
}

/// Output modalities a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputModality {
    Text,
    Image,
    Embeddings,
}

impl OutputModality {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "embedding" | "embeddings" => Some(Self::Embeddings),
            _ => None,
        }
    }
}

/// A deduplicated model in the canonical catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonicalModel {
    /// Canonical identifier, derived from the raw source id and globally
    /// unique after deduplication.
    pub id: String,

    /// All identifiers this model is known by, including `id` itself.
    /// Deduplicated case-insensitively and ordered longest-first so
    /// consumers can do greedy longest-match lookups.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Human-readable model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Free-text description in the source language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Translated descriptions keyed by locale. Derived by enrichment and
    /// excluded from change detection.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub description_locales: BTreeMap<String, String>,

    /// Input modalities.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub input_modalities: BTreeSet<InputModality>,

    /// Output modalities.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub output_modalities: BTreeSet<OutputModality>,

    /// Whether the model supports reasoning/thinking mode.
    #[serde(default)]
    pub reasoning: TriState,

    /// Whether the model supports tool/function calling.
    #[serde(default)]
    pub tool_calling: TriState,

    /// Whether the model weights are openly available.
    #[serde(default)]
    pub open_weights: TriState,

    /// Knowledge cutoff as an ISO `YYYY-MM` or `YYYY-MM-DD` string.
    /// Both granularities sort correctly lexicographically, which is how
    /// "earliest wins" is decided during merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knowledge: Option<String>,

    /// Invocation parameter names the model supports.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub parameters: BTreeSet<String>,

    /// Default values for parameters, additive only: once a default is
    /// recorded it is never overwritten by a later source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub default_parameters: BTreeMap<String, serde_json::Value>,

    /// Paid/standard offerings, deduplicated via the offering merger.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderOffering>,

    /// Offerings identified as free-tier variants. A provider present here
    /// is never simultaneously present in `providers` for this model.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free_providers: Vec<ProviderOffering>,

    /// Set once the model has disappeared from every source; deprecated
    /// records are retained, never hard-deleted.
    #[serde(default)]
    pub deprecated: bool,

    /// When the model's source-derived content last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_imported_at: Option<DateTime<Utc>>,
}

impl CanonicalModel {
    /// Create an empty model with the given id, aliased to itself.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            aliases: vec![id.clone()],
            id,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::dec;

    use super::*;

    #[test]
    fn test_price_serializes_as_decimal_strings() {
        let price = OfferingPrice {
            currency: "usd".to_string(),
            input: Some(dec!(2.50)),
            output: Some(dec!(10)),
        };

        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["input"], "2.50");
        assert_eq!(json["output"], "10");

        let back: OfferingPrice = serde_json::from_value(json).unwrap();
        assert_eq!(back, price);
    }

    #[test]
    fn test_tristate_roundtrip() {
        #[derive(Serialize, Deserialize)]
        struct Flags {
            #[serde(default)]
            reasoning: TriState,
            #[serde(default)]
            open_weights: TriState,
        }

        let flags: Flags =
            serde_json::from_str(r#"{"reasoning": false, "open_weights": null}"#).unwrap();
        assert_eq!(flags.reasoning, TriState::False);
        assert_eq!(flags.open_weights, TriState::Unknown);

        // A missing field must read back as unknown, not false.
        let flags: Flags = serde_json::from_str("{}").unwrap();
        assert_eq!(flags.reasoning, TriState::Unknown);

        let json = serde_json::to_value(Flags {
            reasoning: TriState::True,
            open_weights: TriState::Unknown,
        })
        .unwrap();
        assert_eq!(json["reasoning"], true);
        assert_eq!(json["open_weights"], serde_json::Value::Null);
    }

    #[test]
    fn test_tristate_merge_false_is_sticky() {
        assert_eq!(TriState::False.merge(TriState::True), TriState::False);
        assert_eq!(TriState::True.merge(TriState::False), TriState::False);
        assert_eq!(TriState::Unknown.merge(TriState::False), TriState::False);
        assert_eq!(TriState::True.merge(TriState::Unknown), TriState::True);
        assert_eq!(TriState::Unknown.merge(TriState::True), TriState::True);
        assert_eq!(
            TriState::Unknown.merge(TriState::Unknown),
            TriState::Unknown
        );
    }

    #[test]
    fn test_modality_parse() {
        assert_eq!(InputModality::parse("text"), Some(InputModality::Text));
        assert_eq!(InputModality::parse("PDF"), Some(InputModality::File));
        assert_eq!(InputModality::parse("hologram"), None);
        assert_eq!(
            OutputModality::parse("embeddings"),
            Some(OutputModality::Embeddings)
        );
        assert_eq!(OutputModality::parse("video"), None);
    }

    #[test]
    fn test_parse_model_with_missing_fields() {
        let json = r#"{
            "id": "test-model"
        }"#;

        let model: CanonicalModel = serde_json::from_str(json).unwrap();
        assert_eq!(model.id, "test-model");
        assert!(model.aliases.is_empty());
        assert_eq!(model.reasoning, TriState::Unknown);
        assert!(!model.deprecated);
        assert!(model.providers.is_empty());
    }

    #[test]
    fn test_new_model_aliases_itself() {
        let model = CanonicalModel::new("gpt-4");
        assert_eq!(model.id, "gpt-4");
        assert_eq!(model.aliases, vec!["gpt-4"]);
    }
}
