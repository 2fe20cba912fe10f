//! Description normalization and carry-forward.

use async_trait::async_trait;

use super::{EnrichmentError, ModelEnrichStep, StepContext};
use crate::catalog::CanonicalModel;

/// Tidies description text and preserves prior enrichment.
///
/// Source descriptions are trimmed, with empty strings normalized to
/// absent. When the fresh record has no description but the previous run's
/// record does, the previous description and its translations are carried
/// forward so an unrelated change (say, a new provider) does not wipe
/// already-paid-for enrichment. Translations are also carried when the base
/// description text is unchanged, which lets the translation step skip
/// those locales entirely.
pub struct DescriptionCarry;

#[async_trait]
impl ModelEnrichStep for DescriptionCarry {
    fn name(&self) -> &'static str {
        "description_carry"
    }

    async fn apply(
        &self,
        ctx: StepContext<'_>,
        mut wip: CanonicalModel,
    ) -> Result<CanonicalModel, EnrichmentError> {
        wip.name = tidy(wip.name);
        wip.description = tidy(wip.description);

        let Some(previous) = ctx.previous else {
            return Ok(wip);
        };

        match &wip.description {
            None => {
                wip.description = previous.description.clone();
                wip.description_locales = previous.description_locales.clone();
            }
            Some(text) if previous.description.as_deref() == Some(text.as_str()) => {
                wip.description_locales = previous.description_locales.clone();
            }
            Some(_) => {}
        }

        Ok(wip)
    }
}

fn tidy(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
