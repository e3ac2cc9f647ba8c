//! SQLite rate-store tests (in-memory database).

use chrono::NaiveDate;
use rust_decimal_macros::dec;

use rates_types::{CurrencyCode, NewRate, RateStore};

use crate::sqlite::SqliteRateStore;

async fn store() -> SqliteRateStore {
    SqliteRateStore::new("sqlite::memory:").await.unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn eur() -> CurrencyCode {
    "EUR".parse().unwrap()
}

#[tokio::test]
async fn test_get_or_create_provider_is_idempotent() {
    let store = store().await;

    let first = store.get_or_create_provider("grandtrunk").await.unwrap();
    let again = store.get_or_create_provider("grandtrunk").await.unwrap();
    assert_eq!(first, again);

    let other = store.get_or_create_provider("fixer.io").await.unwrap();
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn test_insert_and_read_back_rate() {
    let store = store().await;
    let provider = store.get_or_create_provider("grandtrunk").await.unwrap();
    let date = day(2016, 2, 17);

    let record = store
        .insert_new_rate(date, &provider, eur(), dec!(0.88))
        .await
        .unwrap();

    assert_eq!(record.date, date);
    assert_eq!(record.provider_name, "grandtrunk");
    assert_eq!(record.currency, eur());
    assert_eq!(record.rate, dec!(0.88));

    let found = store
        .get_rate_by_date_currency_provider(date, eur(), "grandtrunk")
        .await
        .unwrap();
    assert_eq!(found, Some(record));
}

#[tokio::test]
async fn test_insert_new_rate_keeps_existing_row_on_conflict() {
    let store = store().await;
    let provider = store.get_or_create_provider("grandtrunk").await.unwrap();
    let date = day(2016, 2, 17);

    store
        .insert_new_rate(date, &provider, eur(), dec!(0.88))
        .await
        .unwrap();
    let second = store
        .insert_new_rate(date, &provider, eur(), dec!(0.99))
        .await
        .unwrap();

    // The conflicting insert is a no-op and the original row comes back.
    assert_eq!(second.rate, dec!(0.88));

    let all = store.get_rates_by_date_currency(date, eur()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_get_rates_by_date_currency_orders_by_provider_id() {
    let store = store().await;
    let first = store.get_or_create_provider("grandtrunk").await.unwrap();
    let second = store.get_or_create_provider("currency_layer").await.unwrap();
    let date = day(2016, 2, 17);

    // Insert in reverse priority order; reads must still come back ordered.
    store
        .insert_new_rate(date, &second, eur(), dec!(0.89))
        .await
        .unwrap();
    store
        .insert_new_rate(date, &first, eur(), dec!(0.88))
        .await
        .unwrap();

    let all = store.get_rates_by_date_currency(date, eur()).await.unwrap();
    let providers: Vec<_> = all.iter().map(|r| r.provider_id).collect();
    assert_eq!(providers, vec![first.id, second.id]);
    assert_eq!(all[0].rate, dec!(0.88));
}

#[tokio::test]
async fn test_bulk_insert_tolerates_duplicates() {
    let store = store().await;
    let provider = store.get_or_create_provider("grandtrunk").await.unwrap();
    let date = day(2016, 2, 17);

    let records = vec![
        NewRate {
            date,
            provider_id: provider.id,
            currency: eur(),
            rate: dec!(0.88),
        },
        NewRate {
            date,
            provider_id: provider.id,
            currency: eur(),
            rate: dec!(0.90),
        },
        NewRate {
            date,
            provider_id: provider.id,
            currency: "CZK".parse().unwrap(),
            rate: dec!(24.20),
        },
    ];

    store.insert_rates(&records).await.unwrap();

    let eur_rows = store.get_rates_by_date_currency(date, eur()).await.unwrap();
    assert_eq!(eur_rows.len(), 1);
    assert_eq!(eur_rows[0].rate, dec!(0.88));

    let czk_rows = store
        .get_rates_by_date_currency(date, "CZK".parse().unwrap())
        .await
        .unwrap();
    assert_eq!(czk_rows.len(), 1);
}

#[tokio::test]
async fn test_sum_of_rates_groups_by_provider() {
    let store = store().await;
    let first = store.get_or_create_provider("grandtrunk").await.unwrap();
    let second = store.get_or_create_provider("currency_layer").await.unwrap();

    for (offset, rate) in [(0, dec!(0.88)), (1, dec!(0.90)), (2, dec!(0.92))] {
        store
            .insert_new_rate(day(2016, 2, 10 + offset), &first, eur(), rate)
            .await
            .unwrap();
    }
    for (offset, rate) in [(0, dec!(0.89)), (1, dec!(0.91))] {
        store
            .insert_new_rate(day(2016, 2, 10 + offset), &second, eur(), rate)
            .await
            .unwrap();
    }

    let sums = store
        .get_sum_of_rates_in_period(day(2016, 2, 10), day(2016, 2, 12), eur())
        .await
        .unwrap();

    assert_eq!(sums.len(), 2);
    assert_eq!(sums[0].provider_id, first.id);
    assert_eq!(sums[0].count, 3);
    assert_eq!(sums[0].sum, dec!(2.70));
    assert_eq!(sums[1].provider_id, second.id);
    assert_eq!(sums[1].count, 2);
    assert_eq!(sums[1].sum, dec!(1.80));
}

#[tokio::test]
async fn test_sum_of_rates_respects_period_bounds() {
    let store = store().await;
    let provider = store.get_or_create_provider("grandtrunk").await.unwrap();

    store
        .insert_new_rate(day(2016, 2, 9), &provider, eur(), dec!(0.50))
        .await
        .unwrap();
    store
        .insert_new_rate(day(2016, 2, 10), &provider, eur(), dec!(0.88))
        .await
        .unwrap();
    store
        .insert_new_rate(day(2016, 2, 13), &provider, eur(), dec!(0.70))
        .await
        .unwrap();

    let sums = store
        .get_sum_of_rates_in_period(day(2016, 2, 10), day(2016, 2, 12), eur())
        .await
        .unwrap();

    assert_eq!(sums.len(), 1);
    assert_eq!(sums[0].count, 1);
    assert_eq!(sums[0].sum, dec!(0.88));
}

#[tokio::test]
async fn test_rates_by_dates_for_currency_in_period() {
    let store = store().await;
    let first = store.get_or_create_provider("grandtrunk").await.unwrap();
    let second = store.get_or_create_provider("currency_layer").await.unwrap();

    store
        .insert_new_rate(day(2016, 2, 10), &first, eur(), dec!(0.88))
        .await
        .unwrap();
    store
        .insert_new_rate(day(2016, 2, 10), &second, eur(), dec!(0.89))
        .await
        .unwrap();
    store
        .insert_new_rate(day(2016, 2, 12), &first, eur(), dec!(0.90))
        .await
        .unwrap();
    // Outside the requested period.
    store
        .insert_new_rate(day(2016, 2, 20), &first, eur(), dec!(0.99))
        .await
        .unwrap();

    let by_date = store
        .get_rates_by_dates_for_currency_in_period(eur(), day(2016, 2, 10), day(2016, 2, 12))
        .await
        .unwrap();

    assert_eq!(by_date.len(), 2);
    assert_eq!(
        by_date.get(&day(2016, 2, 10)),
        Some(&vec![dec!(0.88), dec!(0.89)])
    );
    assert_eq!(by_date.get(&day(2016, 2, 12)), Some(&vec![dec!(0.90)]));
    assert!(!by_date.contains_key(&day(2016, 2, 20)));
}
