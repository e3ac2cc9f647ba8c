//! Exchange-rate records and provider rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CurrencyCode;

/// Provider name attached to synthetic base-currency records. Never stored.
pub const BASE_PROVIDER_NAME: &str = "base";

/// A registered rate provider.
///
/// Rows are created lazily on the first successful insert from a provider,
/// so ids ascend in registration order. That order doubles as the priority
/// tie-break when reconciling conflicting observations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub id: i32,
    pub name: String,
}

/// One provider's observation of a currency for a calendar day.
///
/// `rate` is always expressed as units of `currency` per 1 unit of the base
/// currency. `(date, provider_id, currency)` is unique in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub provider_id: i32,
    pub provider_name: String,
    pub currency: CurrencyCode,
    pub rate: Decimal,
    /// Day-over-day percent change, when a provider reports one.
    pub change_in_percents: Option<Decimal>,
}

impl RateRecord {
    /// Synthetic record for the base currency: rate is definitionally 1 and
    /// requires neither a fetch nor a stored row.
    pub fn base(date: NaiveDate, currency: CurrencyCode) -> Self {
        Self {
            id: 0,
            date,
            provider_id: 0,
            provider_name: BASE_PROVIDER_NAME.to_string(),
            currency,
            rate: Decimal::ONE,
            change_in_percents: None,
        }
    }
}

/// Insert payload for bulk refresh runs.
#[derive(Debug, Clone)]
pub struct NewRate {
    pub date: NaiveDate,
    pub provider_id: i32,
    pub currency: CurrencyCode,
    pub rate: Decimal,
}

/// Per-provider aggregate over a period: observation count and rate sum.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSum {
    pub provider_id: i32,
    pub count: i64,
    pub sum: Decimal,
}
