//! Provider gateway port.
//!
//! One implementation per vendor API. Gateways are kept in an ordered list,
//! never a set: their position is the priority tie-break used when
//! reconciling conflicting observations.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::CurrencyCode;
use crate::error::ProviderError;

/// Port trait for remote rate sources.
///
/// All rates are expressed as units of the requested currency per 1 unit of
/// the base currency.
#[async_trait::async_trait]
pub trait RateProvider: Send + Sync + 'static {
    /// Stable identifier, also used as the provider's store key.
    fn name(&self) -> &str;

    /// Whether the vendor enforces a periodic request quota. Quota-bearing
    /// providers are excluded from reactive historical backfill.
    fn has_request_limit(&self) -> bool {
        false
    }

    /// Clears the quota-exceeded latch. The caller decides when (e.g. on the
    /// first day of the vendor's billing month); gateways never reset
    /// themselves from the ambient clock.
    fn reset_request_limit(&self) {}

    /// Currencies the vendor can serve for the reference date.
    async fn get_supported_currencies(
        &self,
        date_of_exchange: NaiveDate,
    ) -> Result<HashSet<CurrencyCode>, ProviderError>;

    /// One currency's rate for one day, if the vendor has it.
    async fn get_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Option<Decimal>, ProviderError>;

    /// All requested currencies for one day.
    async fn get_all_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError>;

    /// Historical series from `origin_date` up to today.
    async fn get_historical(
        &self,
        origin_date: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>>, ProviderError>;
}
