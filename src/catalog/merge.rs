//! Deterministic merging of per-provider offerings.
//!
//! Different sources frequently describe the same provider of the same
//! model with slightly different identifiers and numbers. The merger folds
//! such offerings into one, always resolving conflicts the same way:
//! limits take the minimum known value so capability is never overstated,
//! prices take the maximum known value so cost is never understated.

use super::types::{OfferingPrice, ProviderOffering};

/// Names shorter than this are too generic to identify a provider.
const MIN_NAME_PREFIX_LEN: usize = 6;

/// Fold a list of offerings, merging entries that describe the same
/// provider.
///
/// The fold is stable: output order is first-seen order, and when an
/// attribute tie-break says "keep existing", the earlier offering wins.
/// Input order is the source-fetch order, so source registration order
/// decides which record anchors a merge.
pub fn merge_offerings(offerings: Vec<ProviderOffering>) -> Vec<ProviderOffering> {
    offerings
        .into_iter()
        .fold(Vec::new(), |mut out: Vec<ProviderOffering>, incoming| {
            match out.iter().position(|existing| same_provider(existing, &incoming)) {
                Some(idx) => {
                    let merged = merge_pair(out[idx].clone(), incoming);
                    out[idx] = merged;
                }
                None => out.push(incoming),
            }
            out
        })
}

/// Two offerings are "the same provider" when they quote the same currency
/// (both-absent counts) and either share a provider id or one provider name
/// is a non-trivial prefix of the other.
fn same_provider(a: &ProviderOffering, b: &ProviderOffering) -> bool {
    let currency = |o: &ProviderOffering| o.price.as_ref().map(|p| p.currency.clone());
    if currency(a) != currency(b) {
        return false;
    }
    a.provider_id == b.provider_id || names_overlap(&a.provider_name, &b.provider_name)
}

fn names_overlap(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            shorter.len() >= MIN_NAME_PREFIX_LEN && longer.starts_with(shorter.as_str())
        }
        _ => false,
    }
}

fn merge_pair(existing: ProviderOffering, incoming: ProviderOffering) -> ProviderOffering {
    ProviderOffering {
        // Shorter id is the more canonical one; ties keep the existing.
        provider_id: if incoming.provider_id.len() < existing.provider_id.len() {
            incoming.provider_id
        } else {
            existing.provider_id
        },
        provider_name: longer_name(existing.provider_name, incoming.provider_name),
        context_length: min_known(existing.context_length, incoming.context_length),
        input_limit: min_known(existing.input_limit, incoming.input_limit),
        output_limit: min_known(existing.output_limit, incoming.output_limit),
        price: merge_price(existing.price, incoming.price),
    }
}

/// The more descriptive (longer) name wins; a present name is never
/// replaced by an absent or empty one. Ties keep the existing name.
fn longer_name(existing: Option<String>, incoming: Option<String>) -> Option<String> {
    let len = |n: &Option<String>| n.as_deref().map(str::len).unwrap_or(0);
    if len(&incoming) > len(&existing) { incoming } else { existing }
}

fn merge_price(
    existing: Option<OfferingPrice>,
    incoming: Option<OfferingPrice>,
) -> Option<OfferingPrice> {
    // `same_provider` guarantees matching currencies, including both-absent.
    match (existing, incoming) {
        (Some(a), Some(b)) => Some(OfferingPrice {
            currency: a.currency,
            input: max_known(a.input, b.input),
            output: max_known(a.output, b.output),
        }),
        (a, b) => a.or(b),
    }
}

fn min_known<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn max_known<T: Ord>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
