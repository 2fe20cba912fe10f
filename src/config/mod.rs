//! Configuration for an aggregation run.
//!
//! The tool is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax. All sections are
//! optional with sensible defaults, so an empty file is a valid (if
//! enrichment-free) configuration.
//!
//! # Example
//!
//! ```toml
//! [store]
//! catalog_path = "data/catalog.json"
//! hashes_path = "data/hashes.json"
//!
//! [sources]
//! order = ["openrouter", "models_dev"]
//!
//! [provider_names]
//! openrouter = "OpenRouter"
//!
//! [enrich.currency]
//! enabled = true
//! target = "usd"
//!
//! [enrich.currency.rates]
//! eur = "1.08"
//! ```

use std::{collections::BTreeMap, path::PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error loading or parsing a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown source id '{id}' in sources.order")]
    UnknownSource { id: String },
}

/// Root configuration for an aggregation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Persistence paths.
    #[serde(default)]
    pub store: StoreConfig,

    /// Source adapter configuration, including fetch order.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Display names for provider ids, injected into the provider
    /// directory rebuild. Providers absent from this table fall back to the
    /// best name observed in source data.
    #[serde(default)]
    pub provider_names: BTreeMap<String, String>,

    /// Enrichment configuration.
    #[serde(default)]
    pub enrich: EnrichConfig,
}

impl RunConfig {
    /// Load configuration from a TOML file, interpolating `${VAR}`
    /// references from the environment first.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let expanded = expand_env_vars(&raw);
        toml::from_str(&expanded).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Replace `${VAR_NAME}` references with environment variable values.
/// Unset variables interpolate to an empty string.
fn expand_env_vars(raw: &str) -> String {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").expect("valid regex");
    re.replace_all(raw, |caps: &regex::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Persistence paths for the catalog and the content-hash map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Catalog document (models plus provider directory).
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Model id → content hash map.
    #[serde(default = "default_hashes_path")]
    pub hashes_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            hashes_path: default_hashes_path(),
        }
    }
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("data/catalog.json")
}

fn default_hashes_path() -> PathBuf {
    PathBuf::from("data/hashes.json")
}

// ─────────────────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Source adapter configuration.
///
/// `order` is the fetch order, and therefore the dedup precedence order:
/// when two sources disagree on an attribute whose tie-break is
/// "first wins", the source listed earlier wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourcesConfig {
    /// Fetch order by source id. Unknown ids are rejected when adapters
    /// are constructed; disabled sources are skipped.
    #[serde(default = "default_source_order")]
    pub order: Vec<String>,

    #[serde(default)]
    pub openrouter: OpenRouterSourceConfig,

    #[serde(default)]
    pub models_dev: ModelsDevSourceConfig,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: default_source_order(),
            openrouter: OpenRouterSourceConfig::default(),
            models_dev: ModelsDevSourceConfig::default(),
        }
    }
}

fn default_source_order() -> Vec<String> {
    vec!["openrouter".to_string(), "models_dev".to_string()]
}

/// OpenRouter model listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenRouterSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_openrouter_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_openrouter_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_openrouter_url() -> String {
    "https://openrouter.ai/api/v1/models".to_string()
}

/// models.dev catalog endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelsDevSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_models_dev_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ModelsDevSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_models_dev_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_models_dev_url() -> String {
    "https://models.dev/api.json".to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// Enrichment
// ─────────────────────────────────────────────────────────────────────────────

/// Enrichment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnrichConfig {
    /// Currency normalization of offering prices.
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Description translation.
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Run the currency step on UNCHANGED models too, so repriced rate
    /// tables reach records whose source content did not change. Without
    /// this, unchanged records are reused verbatim.
    #[serde(default)]
    pub refresh_pricing: bool,
}

/// Currency normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurrencyConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Target currency code, lowercase.
    #[serde(default = "default_currency")]
    pub target: String,

    /// Conversion rates into the target currency: one unit of the keyed
    /// currency equals `rate` units of the target. Decimal strings.
    #[serde(default)]
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: default_currency(),
            rates: BTreeMap::new(),
        }
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

/// Description translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TranslationConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Translation service endpoint.
    #[serde(default)]
    pub api_url: String,

    /// Target locales (BCP 47 language tags).
    #[serde(default)]
    pub locales: Vec<String>,

    /// Environment variable holding the service API key. The key itself
    /// never appears in configuration files.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Directory for the translation cache. Caching is disabled when
    /// unset.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: String::new(),
            locales: Vec::new(),
            api_key_env: None,
            cache_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}
