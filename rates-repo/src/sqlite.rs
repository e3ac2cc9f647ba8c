//! SQLite rate-store adapter.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use rates_types::{
    CurrencyCode, NewRate, ProviderRecord, RateRecord, RateStore, RateSum, RepoError,
};

use crate::types::{self, DbDateRate, DbProvider, DbProviderRate, DbRate};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Rate Store
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite rate store. Dates and decimals live in TEXT columns;
/// `YYYY-MM-DD` strings keep range scans correct.
pub struct SqliteRateStore {
    pool: SqlitePool,
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

impl SqliteRateStore {
    /// Creates a new SQLite rate store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single connection keeps in-memory databases alive across queries.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        let ddl = include_str!("../migrations/0001_create_tables.sql");
        sqlx::query(ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for SqliteRateStore {
    async fn get_or_create_provider(&self, name: &str) -> Result<ProviderRecord, RepoError> {
        sqlx::query(r#"INSERT INTO providers (name) VALUES (?) ON CONFLICT (name) DO NOTHING"#)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let row: DbProvider = sqlx::query_as(r#"SELECT id, name FROM providers WHERE name = ?"#)
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.into_domain())
    }

    async fn get_rates_by_date_currency(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateRecord>, RepoError> {
        let rows: Vec<DbRate> = sqlx::query_as(
            r#"SELECT er.id, er.date, er.provider_id, p.name AS provider_name,
                      er.currency, er.rate, er.change_in_percents
               FROM exchange_rates er
               JOIN providers p ON p.id = er.provider_id
               WHERE er.date = ? AND er.currency = ?
               ORDER BY er.provider_id"#,
        )
        .bind(format_date(date_of_exchange))
        .bind(currency.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbRate::into_domain).collect()
    }

    async fn get_rate_by_date_currency_provider(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
        provider_name: &str,
    ) -> Result<Option<RateRecord>, RepoError> {
        let row: Option<DbRate> = sqlx::query_as(
            r#"SELECT er.id, er.date, er.provider_id, p.name AS provider_name,
                      er.currency, er.rate, er.change_in_percents
               FROM exchange_rates er
               JOIN providers p ON p.id = er.provider_id
               WHERE er.date = ? AND er.currency = ? AND p.name = ?
               LIMIT 1"#,
        )
        .bind(format_date(date_of_exchange))
        .bind(currency.as_str())
        .bind(provider_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbRate::into_domain).transpose()
    }

    async fn insert_new_rate(
        &self,
        date_of_exchange: NaiveDate,
        provider: &ProviderRecord,
        currency: CurrencyCode,
        rate: Decimal,
    ) -> Result<RateRecord, RepoError> {
        sqlx::query(
            r#"INSERT INTO exchange_rates (date, provider_id, currency, rate)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (date, provider_id, currency) DO NOTHING"#,
        )
        .bind(format_date(date_of_exchange))
        .bind(provider.id)
        .bind(currency.as_str())
        .bind(rate.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        // Inserted or already present, the winning row is read back either way.
        self.get_rate_by_date_currency_provider(date_of_exchange, currency, &provider.name)
            .await?
            .ok_or(RepoError::NotFound)
    }

    async fn insert_rates(&self, records: &[NewRate]) -> Result<(), RepoError> {
        let mut duplicates: BTreeSet<CurrencyCode> = BTreeSet::new();

        for record in records {
            let result = sqlx::query(
                r#"INSERT INTO exchange_rates (date, provider_id, currency, rate)
                   VALUES (?, ?, ?, ?)
                   ON CONFLICT (date, provider_id, currency) DO NOTHING"#,
            )
            .bind(format_date(record.date))
            .bind(record.provider_id)
            .bind(record.currency.as_str())
            .bind(record.rate.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

            if result.rows_affected() == 0 {
                duplicates.insert(record.currency);
            }
        }

        if !duplicates.is_empty() {
            tracing::info!(
                currencies = %duplicates.iter().map(CurrencyCode::as_str).collect::<Vec<_>>().join(", "),
                "exchange rates already in the database were skipped"
            );
        }
        Ok(())
    }

    async fn get_sum_of_rates_in_period(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateSum>, RepoError> {
        let rows: Vec<DbProviderRate> = sqlx::query_as(
            r#"SELECT provider_id, rate
               FROM exchange_rates
               WHERE date >= ? AND date <= ? AND currency = ?
               ORDER BY provider_id"#,
        )
        .bind(format_date(start_date))
        .bind(format_date(end_date))
        .bind(currency.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        // TEXT rates cannot be summed in SQL; fold the ordered rows instead.
        let mut sums: Vec<RateSum> = Vec::new();
        for row in rows {
            let rate = types::parse_decimal(&row.rate)?;
            match sums.last_mut() {
                Some(last) if last.provider_id == row.provider_id => {
                    last.count += 1;
                    last.sum += rate;
                }
                _ => sums.push(RateSum {
                    provider_id: row.provider_id,
                    count: 1,
                    sum: rate,
                }),
            }
        }
        Ok(sums)
    }

    async fn get_rates_by_dates_for_currency_in_period(
        &self,
        currency: CurrencyCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, Vec<Decimal>>, RepoError> {
        let rows: Vec<DbDateRate> = sqlx::query_as(
            r#"SELECT date, rate
               FROM exchange_rates
               WHERE currency = ? AND date >= ? AND date <= ?
               ORDER BY date, provider_id"#,
        )
        .bind(currency.as_str())
        .bind(format_date(start_date))
        .bind(format_date(end_date))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut rates_by_date: BTreeMap<NaiveDate, Vec<Decimal>> = BTreeMap::new();
        for row in rows {
            rates_by_date
                .entry(types::parse_date(&row.date)?)
                .or_default()
                .push(types::parse_decimal(&row.rate)?);
        }
        Ok(rates_by_date)
    }
}
