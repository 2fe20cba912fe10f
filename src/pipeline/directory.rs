//! Provider directory derived from the assembled catalog.
//!
//! The directory is a secondary output structure: a summary of every
//! provider appearing anywhere in the catalog, with a display name and a
//! model count. It is recomputed from scratch on every run — the rebuild
//! is idempotent and independent of model order — and display names come
//! from an injected configuration table rather than a built-in constant so
//! deployments (and tests) can substitute their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::CanonicalModel;

/// Provider id → display name overrides, from `[provider_names]` config.
pub type ProviderNameTable = BTreeMap<String, String>;

/// Directory of all providers referenced by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDirectory {
    #[serde(default)]
    pub providers: BTreeMap<String, DirectoryEntry>,
}

/// One provider's directory entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,

    /// Display name: the configured override when present, otherwise the
    /// best name observed in source data, otherwise the id itself.
    pub name: String,

    /// Number of catalog models with at least one offering (paid or free)
    /// from this provider. Deprecated models count too; their offerings
    /// are still part of the catalog.
    pub model_count: usize,
}

/// Rebuild the directory from the full model list.
pub fn rebuild_directory(
    models: &[CanonicalModel],
    names: &ProviderNameTable,
) -> ProviderDirectory {
    let mut observed: BTreeMap<String, (Option<String>, usize)> = BTreeMap::new();

    for model in models {
        // Count each provider once per model even when it appears in both
        // offering lists or (pathologically) twice in one list.
        let mut counted: std::collections::BTreeSet<&str> = std::collections::BTreeSet::new();
        for offering in model.providers.iter().chain(model.free_providers.iter()) {
            let entry = observed
                .entry(offering.provider_id.clone())
                .or_insert((None, 0));
            if counted.insert(offering.provider_id.as_str()) {
                entry.1 += 1;
            }
            entry.0 = best_name(entry.0.take(), offering.provider_name.clone());
        }
    }

    let providers = observed
        .into_iter()
        .map(|(id, (observed_name, model_count))| {
            let name = names
                .get(&id)
                .cloned()
                .or(observed_name)
                .unwrap_or_else(|| id.clone());
            (
                id.clone(),
                DirectoryEntry {
                    id,
                    name,
                    model_count,
                },
            )
        })
        .collect();

    ProviderDirectory { providers }
}

/// Longest observed name wins, with a lexicographic tiebreak so the choice
/// does not depend on model order.
fn best_name(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(std::cmp::max_by_key(a, b, |n| (n.len(), n.clone()))),
        (a, b) => a.or(b),
    }
}
