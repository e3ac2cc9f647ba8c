//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use rates_types::{CurrencyCode, ProviderRecord, RateRecord, RepoError};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::NaiveDate;
#[cfg(not(feature = "sqlite"))]
use rust_decimal::Decimal;

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Provider row.
#[derive(FromRow)]
pub struct DbProvider {
    pub id: i32,
    pub name: String,
}

impl DbProvider {
    pub fn into_domain(self) -> ProviderRecord {
        ProviderRecord {
            id: self.id,
            name: self.name,
        }
    }
}

/// Exchange-rate row joined with its provider name.
#[derive(FromRow)]
pub struct DbRate {
    pub id: i64,

    #[cfg(not(feature = "sqlite"))]
    pub date: NaiveDate,
    #[cfg(feature = "sqlite")]
    pub date: String,

    pub provider_id: i32,
    pub provider_name: String,
    pub currency: String,

    #[cfg(not(feature = "sqlite"))]
    pub rate: Decimal,
    #[cfg(feature = "sqlite")]
    pub rate: String,

    #[cfg(not(feature = "sqlite"))]
    pub change_in_percents: Option<Decimal>,
    #[cfg(feature = "sqlite")]
    pub change_in_percents: Option<String>,
}

impl DbRate {
    pub fn into_domain(self) -> Result<RateRecord, RepoError> {
        #[cfg(feature = "sqlite")]
        let (date, rate, change_in_percents) = (
            parse_date(&self.date)?,
            parse_decimal(&self.rate)?,
            self.change_in_percents
                .as_deref()
                .map(parse_decimal)
                .transpose()?,
        );

        #[cfg(not(feature = "sqlite"))]
        let (date, rate, change_in_percents) = (self.date, self.rate, self.change_in_percents);

        Ok(RateRecord {
            id: self.id,
            date,
            provider_id: self.provider_id,
            provider_name: self.provider_name,
            currency: parse_currency(&self.currency)?,
            rate,
            change_in_percents,
        })
    }
}

/// Per-provider aggregate row (PostgreSQL computes the sum in SQL).
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct DbRateSum {
    pub provider_id: i32,
    pub count: i64,
    pub sum: Decimal,
}

/// `(date, rate)` row of the batched period query.
#[derive(FromRow)]
pub struct DbDateRate {
    #[cfg(not(feature = "sqlite"))]
    pub date: NaiveDate,
    #[cfg(feature = "sqlite")]
    pub date: String,

    #[cfg(not(feature = "sqlite"))]
    pub rate: Decimal,
    #[cfg(feature = "sqlite")]
    pub rate: String,
}

/// `(provider_id, rate)` row; SQLite folds sums in Rust since rates are TEXT.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct DbProviderRate {
    pub provider_id: i32,
    pub rate: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Column parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_currency(raw: &str) -> Result<CurrencyCode, RepoError> {
    raw.parse()
        .map_err(|_| RepoError::Database(format!("invalid currency code in row: {raw}")))
}

#[cfg(feature = "sqlite")]
pub fn parse_date(raw: &str) -> Result<chrono::NaiveDate, RepoError> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| RepoError::Database(format!("invalid date in row: {raw}")))
}

#[cfg(feature = "sqlite")]
pub fn parse_decimal(raw: &str) -> Result<rust_decimal::Decimal, RepoError> {
    raw.parse()
        .map_err(|_| RepoError::Database(format!("invalid decimal in row: {raw}")))
}
