//! Offering price normalization into a single target currency.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{EnrichmentError, ModelEnrichStep, StepContext};
use crate::catalog::{CanonicalModel, ProviderOffering};

/// Decimal places kept on converted prices.
const PRICE_SCALE: u32 = 6;

/// Rewrites every offering price into the configured target currency using
/// the configured rate table.
///
/// Conversion happens after merging, so the merge-time invariant that a
/// single offering never mixes currencies is unaffected; converted prices
/// are derived data and do not feed change detection. A price in a currency
/// with no configured rate fails the run.
pub struct CurrencyNormalize;

#[async_trait]
impl ModelEnrichStep for CurrencyNormalize {
    fn name(&self) -> &'static str {
        "currency_normalize"
    }

    async fn apply(
        &self,
        ctx: StepContext<'_>,
        mut wip: CanonicalModel,
    ) -> Result<CanonicalModel, EnrichmentError> {
        let currency = &ctx.config.enrich.currency;

        for offering in wip.providers.iter_mut().chain(wip.free_providers.iter_mut()) {
            convert_offering(offering, &currency.target, &currency.rates)?;
        }
        Ok(wip)
    }
}

fn convert_offering(
    offering: &mut ProviderOffering,
    target: &str,
    rates: &std::collections::BTreeMap<String, Decimal>,
) -> Result<(), EnrichmentError> {
    let Some(price) = offering.price.as_mut() else {
        return Ok(());
    };
    if price.currency == target {
        return Ok(());
    }

    let rate = rates.get(&price.currency).ok_or_else(|| {
        EnrichmentError::new(format!(
            "no conversion rate configured for currency '{}'",
            price.currency
        ))
    })?;

    price.input = price.input.map(|v| (v * rate).round_dp(PRICE_SCALE));
    price.output = price.output.map(|v| (v * rate).round_dp(PRICE_SCALE));
    price.currency = target.to_string();
    Ok(())
}
