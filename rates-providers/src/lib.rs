//! # Rates Providers
//!
//! Provider gateway adapters: one HTTP-fetch-and-parse client per vendor,
//! all implementing the `RateProvider` port from `rates-types`.
//!
//! Gateways are assembled as an **ordered** list - position in the list is
//! the provider priority used as a tie-break during reconciliation.

mod currency_layer;
mod fixer;
mod grandtrunk;
mod http;

pub use currency_layer::CurrencyLayer;
pub use fixer::Fixer;
pub use grandtrunk::GrandTrunk;

use std::sync::Arc;

use rates_types::{CurrencyCode, ProviderError, RateProvider};

/// Access keys for the quota-bearing vendors.
#[derive(Debug, Clone, Default)]
pub struct ProviderSecrets {
    pub currency_layer_access_key: Option<String>,
    pub fixer_access_key: Option<String>,
}

/// Assembles the default gateway list in priority order.
pub fn default_providers(
    base_currency: CurrencyCode,
    secrets: &ProviderSecrets,
) -> Result<Vec<Arc<dyn RateProvider>>, ProviderError> {
    Ok(vec![
        Arc::new(GrandTrunk::new(base_currency)?),
        Arc::new(CurrencyLayer::new(
            base_currency,
            secrets.currency_layer_access_key.clone(),
        )?),
        Arc::new(Fixer::new(base_currency, secrets.fixer_access_key.clone())?),
    ])
}
