//! Data Transfer Objects (DTOs) for requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ─────────────────────────────────────────────────────────────────────────────
// Query parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Query for a single-date exchange rate.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct DateRateQuery {
    /// Source currency code
    #[param(example = "EUR")]
    pub from: String,
    /// Target currency code
    #[param(example = "CZK")]
    pub to: String,
    /// Date of exchange (defaults to today)
    pub date: Option<NaiveDate>,
}

/// Query for a date-range request (daily series or averaged rate).
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct RangeRateQuery {
    /// Source currency code
    #[param(example = "EUR")]
    pub from: String,
    /// Target currency code
    #[param(example = "CZK")]
    pub to: String,
    /// First day of the period (inclusive)
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive)
    pub end_date: NaiveDate,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

/// Single-date exchange rate.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DateRateResponse {
    /// Date of exchange (YYYY-MM-DD)
    #[schema(example = "2016-02-17")]
    pub date: String,
    pub from_currency: String,
    pub to_currency: String,
    /// Decimal rate as a string to avoid float precision loss
    #[schema(example = "27.191")]
    pub exchange_rate: String,
}

/// One day of a range series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatedRate {
    #[schema(example = "2016-02-17")]
    pub date: String,
    #[schema(example = "27.191")]
    pub exchange_rate: String,
}

/// Daily series over an inclusive date range.
///
/// Days with no resolvable rate are absent from `exchange_rates`; the rest
/// of the range still answers (partial-success contract).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DateRatesResponse {
    pub start_date: String,
    pub end_date: String,
    pub from_currency: String,
    pub to_currency: String,
    pub exchange_rates: Vec<DatedRate>,
}

/// Averaged rate over an inclusive date range.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RangeRateResponse {
    pub start_date: String,
    pub end_date: String,
    pub from_currency: String,
    pub to_currency: String,
    #[schema(example = "27.191")]
    pub exchange_rate: String,
}

/// Averaging window for interval rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Daily,
    Weekly,
    Monthly,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "daily",
            Interval::Weekly => "weekly",
            Interval::Monthly => "monthly",
        }
    }
}

/// One interval's rate for the interval-set endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntervalRate {
    pub interval: Interval,
    #[schema(example = "27.191")]
    pub exchange_rate: String,
}

/// Daily/weekly/monthly rates anchored at one date.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IntervalRatesResponse {
    pub date: String,
    pub from_currency: String,
    pub to_currency: String,
    pub intervals: Vec<IntervalRate>,
}
