//! The reconciliation core: canonical model types, identifier
//! normalization, offering merging, and cross-source deduplication.
//!
//! Everything in this module is synchronous and pure: functions take owned
//! or borrowed collections and return new values, with no I/O and no shared
//! mutable state. The async edges (source adapters, enrichment, storage)
//! live elsewhere and feed this core.

mod dedup;
mod ident;
mod merge;
mod types;

pub use dedup::deduplicate;
pub use ident::{
    TransientIdFilter, canonical_id, comparison_key, is_likely_versioned_or_transient,
};
pub use merge::merge_offerings;
pub use types::{
    CanonicalModel, InputModality, OfferingPrice, OutputModality, ProviderOffering, TriState,
};
