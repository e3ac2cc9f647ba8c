//! Update orchestrator: bulk and historical refresh of the rate store.
//!
//! One provider's failure never blocks the others; every provider's outcome
//! is returned as a structured report in addition to being logged.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;

use rates_types::{
    CurrencyCode, NewRate, ProviderUpdateReport, RateProvider, RateStore, UpdateOutcome,
};

pub struct RateUpdater<S: RateStore> {
    store: S,
    providers: Vec<Arc<dyn RateProvider>>,
    supported_currencies: HashSet<CurrencyCode>,
}

impl<S: RateStore> RateUpdater<S> {
    pub fn new(
        store: S,
        providers: Vec<Arc<dyn RateProvider>>,
        supported_currencies: HashSet<CurrencyCode>,
    ) -> Self {
        Self {
            store,
            providers,
            supported_currencies,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Clears every gateway's quota latch. The caller supplies the signal
    /// (typically: the run date is the first day of the month).
    pub fn reset_request_limits(&self) {
        for provider in &self.providers {
            provider.reset_request_limit();
        }
    }

    /// Refreshes all providers' rates for one date.
    pub async fn update_all_rates_by_date(
        &self,
        date_of_exchange: NaiveDate,
    ) -> Vec<ProviderUpdateReport> {
        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            tracing::info!(
                provider = provider.name(),
                date = %date_of_exchange,
                "update started"
            );
            let outcome = self
                .update_provider_by_date(provider.as_ref(), date_of_exchange)
                .await;
            self.log_outcome(provider.name(), &outcome);
            reports.push(ProviderUpdateReport {
                provider: provider.name().to_string(),
                outcome,
            });
        }
        reports
    }

    /// Refreshes all providers' historical series from `origin_date` to today.
    pub async fn update_all_historical_rates(
        &self,
        origin_date: NaiveDate,
    ) -> Vec<ProviderUpdateReport> {
        let mut reports = Vec::with_capacity(self.providers.len());
        for provider in &self.providers {
            tracing::info!(
                provider = provider.name(),
                origin = %origin_date,
                "updating all historical rates"
            );
            let outcome = self
                .update_provider_historical(provider.as_ref(), origin_date)
                .await;
            self.log_outcome(provider.name(), &outcome);
            reports.push(ProviderUpdateReport {
                provider: provider.name().to_string(),
                outcome,
            });
        }
        reports
    }

    fn log_outcome(&self, provider: &str, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Updated { records } => {
                tracing::info!(provider, records, "update succeeded")
            }
            UpdateOutcome::Empty => tracing::error!(
                provider,
                "update failed: provider did not return any exchange rates"
            ),
            UpdateOutcome::Failed { reason } => {
                tracing::error!(provider, reason, "update failed")
            }
        }
    }

    async fn update_provider_by_date(
        &self,
        provider: &dyn RateProvider,
        date_of_exchange: NaiveDate,
    ) -> UpdateOutcome {
        let day_rates = match provider
            .get_all_by_date(date_of_exchange, &self.supported_currencies)
            .await
        {
            Ok(day_rates) => day_rates,
            Err(err) => {
                return UpdateOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };
        if day_rates.is_empty() {
            return UpdateOutcome::Empty;
        }

        let db_provider = match self.store.get_or_create_provider(provider.name()).await {
            Ok(db_provider) => db_provider,
            Err(err) => {
                return UpdateOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let records: Vec<NewRate> = day_rates
            .into_iter()
            .map(|(currency, rate)| NewRate {
                date: date_of_exchange,
                provider_id: db_provider.id,
                currency,
                rate,
            })
            .collect();

        match self.store.insert_rates(&records).await {
            Ok(()) => UpdateOutcome::Updated {
                records: records.len(),
            },
            Err(err) => UpdateOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }

    async fn update_provider_historical(
        &self,
        provider: &dyn RateProvider,
        origin_date: NaiveDate,
    ) -> UpdateOutcome {
        let date_rates = match provider
            .get_historical(origin_date, &self.supported_currencies)
            .await
        {
            Ok(date_rates) => date_rates,
            Err(err) => {
                return UpdateOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };
        if date_rates.is_empty() {
            return UpdateOutcome::Empty;
        }

        let db_provider = match self.store.get_or_create_provider(provider.name()).await {
            Ok(db_provider) => db_provider,
            Err(err) => {
                return UpdateOutcome::Failed {
                    reason: err.to_string(),
                };
            }
        };

        let mut total = 0;
        for (day, day_rates) in date_rates {
            let records: Vec<NewRate> = day_rates
                .into_iter()
                .map(|(currency, rate)| NewRate {
                    date: day,
                    provider_id: db_provider.id,
                    currency,
                    rate,
                })
                .collect();
            if let Err(err) = self.store.insert_rates(&records).await {
                return UpdateOutcome::Failed {
                    reason: err.to_string(),
                };
            }
            total += records.len();
        }
        UpdateOutcome::Updated { records: total }
    }
}
