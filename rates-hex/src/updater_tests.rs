//! RateUpdater unit tests.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal_macros::dec;

    use rates_types::{CurrencyCode, RateProvider, RateStore, UpdateOutcome};

    use crate::RateUpdater;
    use crate::service_tests::mocks::{MockProvider, MockStore};

    fn supported() -> HashSet<CurrencyCode> {
        ["USD", "EUR", "CZK"]
            .iter()
            .map(|c| c.parse().unwrap())
            .collect()
    }

    fn updater(
        store: MockStore,
        providers: Vec<Arc<dyn RateProvider>>,
    ) -> RateUpdater<MockStore> {
        RateUpdater::new(store, providers, supported())
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_update_reports_every_provider_outcome() {
        let broken = Arc::new(MockProvider::new("fixer.io", true).failing());
        let empty = Arc::new(MockProvider::new("currency_layer", true));
        let healthy = Arc::new(
            MockProvider::new("grandtrunk", false)
                .with_rate("EUR", dec!(0.77))
                .with_rate("CZK", dec!(24.20)),
        );

        let updater = updater(MockStore::new(), vec![broken, empty, healthy]);
        let reports = updater.update_all_rates_by_date(day(2016, 2, 17)).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].provider, "fixer.io");
        assert!(matches!(reports[0].outcome, UpdateOutcome::Failed { .. }));
        assert_eq!(reports[1].provider, "currency_layer");
        assert_eq!(reports[1].outcome, UpdateOutcome::Empty);
        // The earlier failures did not block the last provider.
        assert_eq!(reports[2].provider, "grandtrunk");
        assert_eq!(reports[2].outcome, UpdateOutcome::Updated { records: 2 });

        assert_eq!(updater.store().rate_count(), 2);
    }

    #[tokio::test]
    async fn test_update_registers_provider_and_stores_rates() {
        let date = day(2016, 2, 17);
        let provider = Arc::new(
            MockProvider::new("currency_layer", true)
                .with_rate("EUR", dec!(0.77))
                .with_rate("USD", dec!(1)),
        );

        let updater = updater(MockStore::new(), vec![provider]);
        let reports = updater.update_all_rates_by_date(date).await;

        assert_eq!(reports[0].outcome, UpdateOutcome::Updated { records: 2 });

        let db_provider = updater
            .store()
            .get_or_create_provider("currency_layer")
            .await
            .unwrap();
        let stored = updater
            .store()
            .get_rates_by_date_currency(date, "EUR".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].provider_id, db_provider.id);
        assert_eq!(stored[0].rate, dec!(0.77));
    }

    #[tokio::test]
    async fn test_repeated_update_is_conflict_tolerant() {
        let date = day(2016, 2, 17);
        let provider =
            Arc::new(MockProvider::new("grandtrunk", false).with_rate("EUR", dec!(0.77)));

        let updater = updater(MockStore::new(), vec![provider]);
        updater.update_all_rates_by_date(date).await;
        let reports = updater.update_all_rates_by_date(date).await;

        // Duplicates are skipped silently, the run still succeeds.
        assert_eq!(reports[0].outcome, UpdateOutcome::Updated { records: 1 });
        assert_eq!(updater.store().rate_count(), 1);
    }

    #[tokio::test]
    async fn test_historical_update_inserts_day_by_day() {
        let origin = Utc::now().date_naive() - Duration::days(3);
        let provider = Arc::new(
            MockProvider::new("grandtrunk", false)
                .with_historical(origin, "EUR", dec!(0.75))
                .with_historical(origin, "CZK", dec!(24.0))
                .with_historical(origin + Duration::days(1), "EUR", dec!(0.76))
                .with_historical(origin + Duration::days(1), "CZK", dec!(24.1)),
        );

        let updater = updater(MockStore::new(), vec![provider]);
        let reports = updater.update_all_historical_rates(origin).await;

        assert_eq!(reports[0].outcome, UpdateOutcome::Updated { records: 4 });
        assert_eq!(updater.store().rate_count(), 4);

        let first_day = updater
            .store()
            .get_rates_by_date_currency(origin, "EUR".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(first_day.len(), 1);
        assert_eq!(first_day[0].rate, dec!(0.75));
    }

    #[tokio::test]
    async fn test_historical_update_with_empty_series_reports_empty() {
        let provider = Arc::new(MockProvider::new("grandtrunk", false));

        let updater = updater(MockStore::new(), vec![provider]);
        let reports = updater
            .update_all_historical_rates(day(2016, 2, 17))
            .await;

        assert_eq!(reports[0].outcome, UpdateOutcome::Empty);
    }

    #[tokio::test]
    async fn test_reset_request_limits_reaches_every_gateway() {
        let first = Arc::new(MockProvider::new("currency_layer", true));
        let second = Arc::new(MockProvider::new("fixer.io", true));

        let updater = updater(MockStore::new(), vec![first.clone(), second.clone()]);
        updater.reset_request_limits();

        assert_eq!(first.limit_resets.load(Ordering::Relaxed), 1);
        assert_eq!(second.limit_resets.load(Ordering::Relaxed), 1);
    }
}
