//! Batch description translation.
//!
//! Translation is the most expensive enrichment in the pipeline, so it runs
//! as a batch step: one request per target locale carrying every text that
//! still needs translating, after the file cache and carried-forward
//! translations have been consulted.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BatchEnrichStep, EnrichmentError, TranslationCache};
use crate::{
    catalog::CanonicalModel,
    config::{RunConfig, TranslationConfig},
};

/// Request body sent to the translation service.
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    target: &'a str,
    texts: Vec<&'a str>,
}

/// Response body expected from the translation service: one translation per
/// input text, in order.
#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translations: Vec<String>,
}

/// Translates model descriptions into the configured locales, filling
/// `description_locales`.
pub struct TranslateDescriptions {
    api_url: String,
    locales: Vec<String>,
    api_key_env: Option<String>,
    cache_dir: Option<std::path::PathBuf>,
    timeout: std::time::Duration,
}

impl TranslateDescriptions {
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            locales: config.locales.clone(),
            api_key_env: config.api_key_env.clone(),
            cache_dir: config.cache_dir.clone(),
            timeout: std::time::Duration::from_secs(config.timeout_secs),
        }
    }

    fn api_key(&self) -> Result<Option<String>, EnrichmentError> {
        let Some(var) = &self.api_key_env else {
            return Ok(None);
        };
        std::env::var(var)
            .map(Some)
            .map_err(|_| EnrichmentError::new(format!("environment variable {var} is not set")))
    }

    async fn translate_batch(
        &self,
        client: &reqwest::Client,
        locale: &str,
        texts: Vec<&str>,
    ) -> Result<Vec<String>, EnrichmentError> {
        let mut request = client
            .post(&self.api_url)
            .timeout(self.timeout)
            .json(&TranslateRequest {
                target: locale,
                texts: texts.clone(),
            });
        if let Some(key) = self.api_key()? {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EnrichmentError::new(format!(
                "translation service returned {} for locale {locale}",
                response.status()
            )));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| EnrichmentError::new(format!("unparseable translation response: {e}")))?;

        if body.translations.len() != texts.len() {
            return Err(EnrichmentError::new(format!(
                "translation service returned {} texts for {} inputs (locale {locale})",
                body.translations.len(),
                texts.len()
            )));
        }
        Ok(body.translations)
    }
}

#[async_trait]
impl BatchEnrichStep for TranslateDescriptions {
    fn name(&self) -> &'static str {
        "translate_descriptions"
    }

    async fn apply(
        &self,
        mut models: Vec<CanonicalModel>,
        _config: &RunConfig,
    ) -> Result<Vec<CanonicalModel>, EnrichmentError> {
        if self.api_url.is_empty() {
            return Err(EnrichmentError::new(
                "translation is enabled but api_url is empty",
            ));
        }

        let mut cache = self.cache_dir.clone().map(TranslationCache::new);
        let client = reqwest::Client::new();

        for locale in &self.locales {
            // Indexes of models still missing this locale after cache hits.
            let mut pending: Vec<usize> = Vec::new();

            for (idx, model) in models.iter_mut().enumerate() {
                let Some(text) = model.description.clone() else {
                    continue;
                };
                if model.description_locales.contains_key(locale) {
                    continue;
                }
                if let Some(hit) = cache.as_ref().and_then(|c| c.get(locale, &text)) {
                    model.description_locales.insert(locale.clone(), hit);
                } else {
                    pending.push(idx);
                }
            }

            if pending.is_empty() {
                continue;
            }

            let texts: Vec<String> = pending
                .iter()
                .map(|&idx| models[idx].description.clone().unwrap_or_default())
                .collect();
            let translated = self
                .translate_batch(&client, locale, texts.iter().map(String::as_str).collect())
                .await?;

            tracing::debug!(
                locale = %locale,
                translated = translated.len(),
                "Translated description batch"
            );

            for (i, (&idx, translation)) in pending.iter().zip(&translated).enumerate() {
                if let Some(cache) = cache.as_mut() {
                    cache.put(locale, &texts[i], translation)?;
                }
                models[idx]
                    .description_locales
                    .insert(locale.clone(), translation.clone());
            }
        }

        Ok(models)
    }
}

/// Locale-keyed view of a model's translated descriptions, exposed for
/// consumers that want one locale's catalog.
pub fn localized_description<'a>(
    model: &'a CanonicalModel,
    locale: &str,
) -> Option<&'a str> {
    model
        .description_locales
        .get(locale)
        .or(model.description.as_ref())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;
    use crate::config::TranslationConfig;

    fn step(server_url: &str, cache_dir: Option<std::path::PathBuf>) -> TranslateDescriptions {
        TranslateDescriptions::from_config(&TranslationConfig {
            enabled: true,
            api_url: format!("{server_url}/translate"),
            locales: vec!["ja".to_string()],
            api_key_env: None,
            cache_dir,
            timeout_secs: 5,
        })
    }

    fn model(id: &str, description: Option<&str>) -> CanonicalModel {
        let mut model = CanonicalModel::new(id);
        model.description = description.map(str::to_string);
        model
    }

    #[tokio::test]
    async fn test_translates_pending_descriptions_in_one_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": ["モデルA。", "モデルB。"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = RunConfig::default();
        let models = vec![
            model("a", Some("Model A.")),
            model("b", Some("Model B.")),
            model("c", None),
        ];

        let out = step(&server.uri(), None)
            .apply(models, &config)
            .await
            .unwrap();

        assert_eq!(out[0].description_locales["ja"], "モデルA。");
        assert_eq!(out[1].description_locales["ja"], "モデルB。");
        assert!(out[2].description_locales.is_empty());
    }

    #[tokio::test]
    async fn test_cache_prevents_repeat_requests() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": ["モデルA。"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig::default();

        let out = step(&server.uri(), Some(dir.path().to_path_buf()))
            .apply(vec![model("a", Some("Model A."))], &config)
            .await
            .unwrap();
        assert_eq!(out[0].description_locales["ja"], "モデルA。");

        // Second run with the same text is served entirely from the cache;
        // the mock's expect(1) fails the test if a second request arrives.
        let out = step(&server.uri(), Some(dir.path().to_path_buf()))
            .apply(vec![model("a", Some("Model A."))], &config)
            .await
            .unwrap();
        assert_eq!(out[0].description_locales["ja"], "モデルA。");
    }

    #[tokio::test]
    async fn test_already_translated_locales_are_skipped() {
        let server = MockServer::start().await;
        // No mock mounted: any request would 404 and fail the step.
        let config = RunConfig::default();

        let mut m = model("a", Some("Model A."));
        m.description_locales
            .insert("ja".to_string(), "モデルA。".to_string());

        let out = step(&server.uri(), None)
            .apply(vec![m], &config)
            .await
            .unwrap();
        assert_eq!(out[0].description_locales["ja"], "モデルA。");
    }

    #[tokio::test]
    async fn test_service_error_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = RunConfig::default();
        let err = step(&server.uri(), None)
            .apply(vec![model("a", Some("Model A."))], &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_mismatched_response_length_aborts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/translate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "translations": []
            })))
            .mount(&server)
            .await;

        let config = RunConfig::default();
        let err = step(&server.uri(), None)
            .apply(vec![model("a", Some("Model A."))], &config)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("0 texts for 1 inputs"));
    }

    #[test]
    fn test_localized_description_falls_back_to_base() {
        let mut m = model("a", Some("Model A."));
        assert_eq!(localized_description(&m, "ja"), Some("Model A."));
        m.description_locales
            .insert("ja".to_string(), "モデルA。".to_string());
        assert_eq!(localized_description(&m, "ja"), Some("モデルA。"));
    }
}
