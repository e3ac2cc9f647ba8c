//! PostgreSQL rate-store adapter.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;

use rates_types::{
    CurrencyCode, NewRate, ProviderRecord, RateRecord, RateStore, RateSum, RepoError,
};

use crate::types::{DbDateRate, DbProvider, DbRate, DbRateSum};

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL Rate Store
// ─────────────────────────────────────────────────────────────────────────────

/// PostgreSQL rate store.
pub struct PostgresRateStore {
    pool: PgPool,
}

/// Executes SQL statements from a migration file, splitting by semicolons.
async fn execute_migration(pool: &PgPool, sql: &str, name: &str) -> Result<(), anyhow::Error> {
    for statement in sql.split(';') {
        let stmt = statement.trim();
        if !stmt.is_empty() {
            sqlx::query(stmt)
                .execute(pool)
                .await
                .map_err(|e| anyhow::anyhow!("Migration {} failed: {}", name, e))?;
        }
    }
    Ok(())
}

/// Runs all database migrations.
async fn run_migrations(pool: &PgPool) -> Result<(), anyhow::Error> {
    execute_migration(
        pool,
        include_str!("../migrations/0001_create_tables_pg.sql"),
        "0001",
    )
    .await
}

impl PostgresRateStore {
    /// Creates a new PostgreSQL rate store with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the database schema (for testing with existing pool).
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        run_migrations(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl RateStore for PostgresRateStore {
    async fn get_or_create_provider(&self, name: &str) -> Result<ProviderRecord, RepoError> {
        sqlx::query(r#"INSERT INTO providers (name) VALUES ($1) ON CONFLICT (name) DO NOTHING"#)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        let row: DbProvider = sqlx::query_as(r#"SELECT id, name FROM providers WHERE name = $1"#)
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
               WHERE er.date = $1 AND er.currency = $2
               ORDER BY er.provider_id"#,
        )
        .bind(date_of_exchange)
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
               WHERE er.date = $1 AND er.currency = $2 AND p.name = $3
               LIMIT 1"#,
        )
        .bind(date_of_exchange)
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
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (date, provider_id, currency) DO NOTHING"#,
        )
        .bind(date_of_exchange)
        .bind(provider.id)
        .bind(currency.as_str())
        .bind(rate)
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
                   VALUES ($1, $2, $3, $4)
                   ON CONFLICT (date, provider_id, currency) DO NOTHING"#,
            )
            .bind(record.date)
            .bind(record.provider_id)
            .bind(record.currency.as_str())
            .bind(record.rate)
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
        let rows: Vec<DbRateSum> = sqlx::query_as(
            r#"SELECT provider_id, COUNT(*) AS count, SUM(rate) AS sum
               FROM exchange_rates
               WHERE date >= $1 AND date <= $2 AND currency = $3
               GROUP BY provider_id
               ORDER BY provider_id"#,
        )
        .bind(start_date)
        .bind(end_date)
        .bind(currency.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| RateSum {
                provider_id: row.provider_id,
                count: row.count,
                sum: row.sum,
            })
            .collect())
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
               WHERE currency = $1 AND date >= $2 AND date <= $3
               ORDER BY date, provider_id"#,
        )
        .bind(currency.as_str())
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let mut rates_by_date: BTreeMap<NaiveDate, Vec<Decimal>> = BTreeMap::new();
        for row in rows {
            rates_by_date.entry(row.date).or_default().push(row.rate);
        }
        Ok(rates_by_date)
    }
}
