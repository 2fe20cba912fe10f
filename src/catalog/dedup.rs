//! Cross-source model deduplication.
//!
//! Source adapters each emit one record per (provider, model) pair. The
//! deduplicator groups those records into logical models by comparison key
//! and folds each group into a single [`CanonicalModel`], merging offerings
//! through [`merge_offerings`] and model-level attributes under the rules
//! below. The whole pass is a pure reduce: accumulators are owned values,
//! never shared mutable records.

use std::collections::{HashMap, HashSet};

use super::{
    ident::comparison_key,
    merge::merge_offerings,
    types::CanonicalModel,
};

/// Free-tier id suffix convention ("model:free"), case-insensitive.
const FREE_SUFFIX: &str = ":free";

/// Deduplicate per-source records into canonical models.
///
/// The first record encountered per comparison key becomes the canonical
/// target; every later record in the class merges into it. Output order is
/// first-encounter order (the processor sorts the final catalog by id).
pub fn deduplicate(models: Vec<CanonicalModel>) -> Vec<CanonicalModel> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<CanonicalModel> = Vec::new();

    for model in models {
        let (model, is_free) = split_free_variant(model);
        let key = comparison_key(&model.id);

        match index.get(&key) {
            Some(&pos) => {
                let acc = std::mem::take(&mut out[pos]);
                out[pos] = fold_model(acc, model, is_free);
            }
            None => {
                index.insert(key, out.len());
                out.push(init_model(model, is_free));
            }
        }
    }

    out.into_iter().map(finalize_model).collect()
}

/// Detect and strip the `:free` suffix, recording the stripped id as an
/// alias. The original suffixed id stays in the alias list.
fn split_free_variant(mut model: CanonicalModel) -> (CanonicalModel, bool) {
    let lower = model.id.to_ascii_lowercase();
    let Some(stripped_len) = lower.strip_suffix(FREE_SUFFIX).map(str::len) else {
        return (model, false);
    };

    let stripped = model.id[..stripped_len].to_string();
    model.aliases.push(model.id.clone());
    model.aliases.push(stripped.clone());
    model.id = stripped;
    (model, true)
}

/// Seed an accumulator from the first record of a class.
fn init_model(model: CanonicalModel, is_free: bool) -> CanonicalModel {
    if !is_free {
        return model;
    }
    let mut model = model;
    let offerings = std::mem::take(&mut model.providers);
    model.free_providers.extend(offerings);
    model
}

/// Merge a later record of the same class into the accumulator.
fn fold_model(mut acc: CanonicalModel, next: CanonicalModel, is_free: bool) -> CanonicalModel {
    acc.aliases.push(next.id);
    acc.aliases.extend(next.aliases);

    if is_free {
        acc.free_providers.extend(next.providers);
    } else {
        acc.providers.extend(next.providers);
    }
    acc.free_providers.extend(next.free_providers);

    if acc.name.as_deref().unwrap_or("").is_empty() {
        acc.name = next.name.filter(|n| !n.is_empty());
    }
    // First non-empty description wins and is never overwritten.
    if acc.description.as_deref().unwrap_or("").is_empty() {
        acc.description = next.description.filter(|d| !d.is_empty());
    }

    acc.input_modalities.extend(next.input_modalities);
    acc.output_modalities.extend(next.output_modalities);
    acc.parameters.extend(next.parameters);
    for (key, value) in next.default_parameters {
        acc.default_parameters.entry(key).or_insert(value);
    }

    acc.reasoning = acc.reasoning.merge(next.reasoning);
    acc.tool_calling = acc.tool_calling.merge(next.tool_calling);
    acc.open_weights = acc.open_weights.merge(next.open_weights);

    acc.knowledge = earliest(acc.knowledge, next.knowledge);

    acc
}

/// Normalize the fully folded accumulator: merge offering lists, enforce
/// the free/paid exclusivity invariant, and canonicalize aliases.
fn finalize_model(mut model: CanonicalModel) -> CanonicalModel {
    model.providers = merge_offerings(std::mem::take(&mut model.providers));
    model.free_providers = merge_offerings(std::mem::take(&mut model.free_providers));

    // A provider with a paid offering never also appears in the free list.
    let paid: HashSet<String> = model
        .providers
        .iter()
        .map(|o| o.provider_id.clone())
        .collect();
    model
        .free_providers
        .retain(|o| !paid.contains(&o.provider_id));

    model.aliases = normalize_aliases(std::mem::take(&mut model.aliases), &model.id);
    model
}

/// Deduplicate aliases case-insensitively (first-seen casing wins, the id's
/// own casing first) and order them longest-first, with a lexicographic
/// tiebreak so the ordering is total.
fn normalize_aliases(aliases: Vec<String>, id: &str) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();

    for alias in std::iter::once(id.to_string()).chain(aliases) {
        if alias.is_empty() {
            continue;
        }
        if seen.insert(alias.to_lowercase()) {
            out.push(alias);
        }
    }

    out.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    out
}

/// Earliest of two known cutoff dates; unknown never overwrites known.
/// ISO `YYYY-MM` and `YYYY-MM-DD` both order correctly as strings.
fn earliest(a: Option<String>, b: Option<String>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => Some(if b < a { b } else { a }),
        (a, b) => a.or(b),
    }
}
