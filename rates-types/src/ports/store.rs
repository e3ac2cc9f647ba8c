//! Rate store port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, in-memory test doubles) implement this trait.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::{CurrencyCode, NewRate, ProviderRecord, RateRecord, RateSum};
use crate::error::RepoError;

/// Persistence port for exchange-rate records.
///
/// Records are append-only: `(date, provider_id, currency)` is unique and a
/// conflicting insert means "already present" rather than an error.
/// Implementations resolve insert races by re-reading the existing row.
#[async_trait::async_trait]
pub trait RateStore: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Providers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Looks up a provider row by name, creating it on first use.
    async fn get_or_create_provider(&self, name: &str) -> Result<ProviderRecord, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Point lookups
    // ─────────────────────────────────────────────────────────────────────────────

    /// All stored observations for a day and currency, in provider-priority
    /// order (provider id ascending).
    async fn get_rates_by_date_currency(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateRecord>, RepoError>;

    /// A single provider's observation for a day and currency, if present.
    async fn get_rate_by_date_currency_provider(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
        provider_name: &str,
    ) -> Result<Option<RateRecord>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Writes (conflict-tolerant)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Inserts one observation. On a uniqueness conflict the existing row is
    /// read back and returned instead.
    async fn insert_new_rate(
        &self,
        date_of_exchange: NaiveDate,
        provider: &ProviderRecord,
        currency: CurrencyCode,
        rate: Decimal,
    ) -> Result<RateRecord, RepoError>;

    /// Bulk insert for refresh runs. Duplicates are skipped and logged once.
    async fn insert_rates(&self, records: &[NewRate]) -> Result<(), RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Range aggregates
    // ─────────────────────────────────────────────────────────────────────────────

    /// `(provider_id, count, sum)` per provider over an inclusive period,
    /// provider id ascending.
    async fn get_sum_of_rates_in_period(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateSum>, RepoError>;

    /// All observations of a currency in an inclusive period, grouped by day.
    /// One batched query, not one per day.
    async fn get_rates_by_dates_for_currency_in_period(
        &self,
        currency: CurrencyCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<Decimal>>, RepoError>;
}
