//! File-backed cache for translated texts.
//!
//! Keys are deterministic (SHA-256 of locale and source text), so repeated
//! runs and re-enrichments of unchanged text never re-issue a translation
//! request. Reads are safe from anywhere; writes go through `&mut self` so
//! a run has a single writer and lost updates cannot occur.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use super::EnrichmentError;

/// One cached translation per file, under a content-addressed name.
pub struct TranslationCache {
    dir: PathBuf,
}

impl TranslationCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic cache key for a (locale, text) pair.
    pub fn cache_key(locale: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(locale.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, locale: &str, text: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::cache_key(locale, text)))
    }

    /// Look up a cached translation. Unreadable or malformed entries are
    /// treated as misses; the entry will be re-translated and rewritten.
    pub fn get(&self, locale: &str, text: &str) -> Option<String> {
        let raw = std::fs::read_to_string(self.entry_path(locale, text)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Store a translation.
    pub fn put(
        &mut self,
        locale: &str,
        text: &str,
        translation: &str,
    ) -> Result<(), EnrichmentError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            EnrichmentError::new(format!(
                "failed to create translation cache dir {}: {e}",
                self.dir.display()
            ))
        })?;
        let path = self.entry_path(locale, text);
        let body = serde_json::to_string(translation)
            .map_err(|e| EnrichmentError::new(format!("failed to encode cache entry: {e}")))?;
        std::fs::write(&path, body).map_err(|e| {
            EnrichmentError::new(format!(
                "failed to write translation cache entry {}: {e}",
                path.display()
            ))
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
