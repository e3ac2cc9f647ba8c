//! Exchange-rate reconciliation engine.
//!
//! Decides, given possibly-conflicting observations from multiple providers
//! for the same currency and date, which value to trust, how to fill gaps
//! (missing days, future dates, partial provider outages), and how to
//! compute point and averaged rates between two currencies.
//!
//! Orchestrates domain operations through the store and provider ports.
//! Contains NO infrastructure logic - pure business orchestration.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;

use rates_types::{
    AppError, CurrencyCode, DomainError, Interval, IntervalRate, RateProvider, RateRecord,
    RateStore, RateSum, RepoError,
};

/// Sentinel aggregate for a base-currency side of an average computation.
fn base_rate_sum() -> RateSum {
    RateSum {
        provider_id: 0,
        count: 1,
        sum: Decimal::ONE,
    }
}

/// Reconciliation engine over a rate store and an ordered provider list.
///
/// Generic over `S: RateStore` - the adapter is injected at compile time.
/// Provider order is significant: it is the priority used to break ties when
/// observations conflict, so the list is never a set.
pub struct RateService<S: RateStore> {
    store: S,
    providers: Vec<Arc<dyn RateProvider>>,
    base_currency: CurrencyCode,
    supported_currencies: HashSet<CurrencyCode>,
}

impl<S: RateStore> RateService<S> {
    pub fn new(
        store: S,
        providers: Vec<Arc<dyn RateProvider>>,
        base_currency: CurrencyCode,
        supported_currencies: HashSet<CurrencyCode>,
    ) -> Self {
        Self {
            store,
            providers,
            base_currency,
            supported_currencies,
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn base_currency(&self) -> CurrencyCode {
        self.base_currency
    }

    pub fn is_supported(&self, currency: CurrencyCode) -> bool {
        self.supported_currencies.contains(&currency)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Consensus
    // ─────────────────────────────────────────────────────────────────────────────

    /// Collapses N observations for one (date, currency) into one trusted value.
    ///
    /// Observations must arrive pre-sorted by provider priority: with fewer
    /// than three values the first one wins. With three or more, every value
    /// of each pairwise comparison is grouped under that pair's absolute
    /// difference and the group with the smallest difference is selected -
    /// a pair resolves to its first member, a larger group to its most
    /// frequent value (stable mode, first-encountered on ties). Outlier
    /// providers never survive this.
    pub fn pick_the_best(rates: &[Decimal]) -> Result<Decimal, DomainError> {
        match rates {
            [] => Err(DomainError::MissingExchangeRate),
            [first] | [first, _] => Ok(*first),
            _ => {
                let mut differences: BTreeMap<Decimal, Vec<Decimal>> = BTreeMap::new();
                for (i, a) in rates.iter().enumerate() {
                    for b in &rates[i + 1..] {
                        // if (a,b)=1 and (b,c)=1 then differences[1]=[a,b,b,c]
                        let group = differences.entry((*a - *b).abs()).or_default();
                        group.push(*a);
                        group.push(*b);
                    }
                }

                // BTreeMap iteration starts at the smallest difference.
                let (_, group) = differences
                    .iter()
                    .next()
                    .ok_or(DomainError::MissingExchangeRate)?;
                if group.len() == 2 {
                    return Ok(group[0]);
                }

                let mut counts: HashMap<Decimal, usize> = HashMap::new();
                for rate in group {
                    *counts.entry(*rate).or_default() += 1;
                }
                let most_common = counts.values().copied().max().unwrap_or(0);
                group
                    .iter()
                    .find(|rate| counts[*rate] == most_common)
                    .copied()
                    .ok_or(DomainError::MissingExchangeRate)
            }
        }
    }

    /// Clamps strictly-future dates to today; applied before any point lookup.
    pub fn future_date_to_today(date_of_exchange: NaiveDate) -> NaiveDate {
        let today = Self::today();
        if date_of_exchange > today {
            tracing::warn!(
                requested = %date_of_exchange,
                "request for future date, exchange rate of today will be returned instead"
            );
            today
        } else {
            date_of_exchange
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Point lookups with write-on-read backfill
    // ─────────────────────────────────────────────────────────────────────────────

    /// All observations for a date and currency, backfilling providers that
    /// have no stored value yet.
    ///
    /// For today's date a provider's missing value is first stood in by its
    /// yesterday rate (vendors publish once a day and may lag). Historical
    /// gaps are never fetched from quota-bearing providers. A failing
    /// gateway is logged and omitted, never propagated.
    pub async fn get_or_update_rate_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateRecord>, RepoError> {
        if currency == self.base_currency {
            return Ok(vec![RateRecord::base(date_of_exchange, currency)]);
        }

        let today = Self::today();
        let mut exchange_rates = self
            .store
            .get_rates_by_date_currency(date_of_exchange, currency)
            .await?;
        let present: HashSet<String> = exchange_rates
            .iter()
            .map(|r| r.provider_name.clone())
            .collect();
        let missing: Vec<Arc<dyn RateProvider>> = self
            .providers
            .iter()
            .filter(|p| !present.contains(p.name()))
            .cloned()
            .collect();

        for provider in missing {
            if date_of_exchange == today {
                tracing::info!(
                    provider = provider.name(),
                    "today's rates aren't ready yet, using yesterday's rate"
                );
                let previous_day = date_of_exchange - Duration::days(1);
                match self
                    .store
                    .get_rate_by_date_currency_provider(previous_day, currency, provider.name())
                    .await?
                {
                    Some(rate) => {
                        exchange_rates.push(rate);
                        continue;
                    }
                    None => tracing::info!(
                        provider = provider.name(),
                        "yesterday's rate not found, requesting the API"
                    ),
                }
            } else if provider.has_request_limit() {
                // Backfilling historical gaps can easily generate hundreds of
                // requests at once and exhaust a monthly quota.
                tracing::info!(
                    provider = provider.name(),
                    "rate isn't in database and provider has disabled requests for historical data"
                );
                continue;
            }

            match self
                .fetch_and_store_rate(provider.as_ref(), date_of_exchange, currency, today)
                .await
            {
                Ok(Some(record)) => exchange_rates.push(record),
                Ok(None) => {}
                Err(err) => tracing::error!(
                    provider = provider.name(),
                    %currency,
                    date = %date_of_exchange,
                    %err,
                    "requesting exchange rate failed"
                ),
            }
        }

        Ok(exchange_rates)
    }

    async fn fetch_and_store_rate(
        &self,
        provider: &dyn RateProvider,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
        today: NaiveDate,
    ) -> anyhow::Result<Option<RateRecord>> {
        if !provider
            .get_supported_currencies(today)
            .await?
            .contains(&currency)
        {
            return Ok(None);
        }

        let Some(rate) = provider.get_by_date(date_of_exchange, currency).await? else {
            return Ok(None);
        };

        let db_provider = self.store.get_or_create_provider(provider.name()).await?;
        let record = self
            .store
            .insert_new_rate(date_of_exchange, &db_provider, currency, rate)
            .await?;
        Ok(Some(record))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Point rate
    // ─────────────────────────────────────────────────────────────────────────────

    /// Exchange rate between two currencies for one date.
    pub async fn get_exchange_rate_by_date(
        &self,
        date_of_exchange: NaiveDate,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<Decimal, AppError> {
        let date_of_exchange = Self::future_date_to_today(date_of_exchange);

        let from_records = self
            .get_or_update_rate_by_date(date_of_exchange, from_currency)
            .await?;
        let to_records = self
            .get_or_update_rate_by_date(date_of_exchange, to_currency)
            .await?;

        let from_rates: Vec<Decimal> = from_records.iter().map(|r| r.rate).collect();
        let to_rates: Vec<Decimal> = to_records.iter().map(|r| r.rate).collect();

        let best_from = Self::pick_the_best(&from_rates)?;
        let best_to = Self::pick_the_best(&to_rates)?;

        tracing::debug!(%from_currency, best = %best_from, candidates = ?from_rates, "picked best rate");
        tracing::debug!(%to_currency, best = %best_to, candidates = ?to_rates, "picked best rate");

        best_to
            .checked_div(best_from)
            .ok_or_else(|| AppError::NotFound("Exchange rate not found".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Daily series
    // ─────────────────────────────────────────────────────────────────────────────

    /// Per-day exchange rates over an inclusive range.
    ///
    /// A day missing its rate is interpolated from both neighbors when
    /// possible; otherwise it is dropped from the result while the rest of
    /// the range still answers.
    pub async fn get_exchange_rates_by_dates(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<BTreeMap<NaiveDate, String>, AppError> {
        let (start_date, end_date) = if start_date > end_date {
            (end_date, start_date)
        } else {
            (start_date, end_date)
        };

        let dates: Vec<NaiveDate> = start_date
            .iter_days()
            .take_while(|d| *d <= end_date)
            .collect();

        if from_currency == to_currency {
            return Ok(dates.into_iter().map(|d| (d, "1.0".to_string())).collect());
        }

        let from_rates_by_date = self
            .rates_by_dates_for(from_currency, start_date, end_date, &dates)
            .await?;
        let to_rates_by_date = self
            .rates_by_dates_for(to_currency, start_date, end_date, &dates)
            .await?;

        let mut exchange_rates_by_dates = BTreeMap::new();
        for date_of_exchange in dates {
            let best_pair =
                Self::best_rate_for_day(&from_rates_by_date, date_of_exchange, from_currency)
                    .and_then(|best_from| {
                        Self::best_rate_for_day(&to_rates_by_date, date_of_exchange, to_currency)
                            .map(|best_to| (best_from, best_to))
                    });

            match best_pair {
                Ok((best_from, best_to)) => match best_to.checked_div(best_from) {
                    Some(rate) => {
                        exchange_rates_by_dates.insert(date_of_exchange, rate.to_string());
                    }
                    None => tracing::warn!(
                        date = %date_of_exchange,
                        "zero divisor while computing exchange rate"
                    ),
                },
                Err(_) => tracing::warn!(
                    date = %date_of_exchange,
                    %from_currency,
                    %to_currency,
                    "could not determine exchange rate"
                ),
            }
        }

        Ok(exchange_rates_by_dates)
    }

    async fn rates_by_dates_for(
        &self,
        currency: CurrencyCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
        dates: &[NaiveDate],
    ) -> Result<BTreeMap<NaiveDate, Vec<Decimal>>, RepoError> {
        // The base currency is never stored; synthesize a constant series.
        if currency == self.base_currency {
            return Ok(dates.iter().map(|d| (*d, vec![Decimal::ONE])).collect());
        }
        self.store
            .get_rates_by_dates_for_currency_in_period(currency, start_date, end_date)
            .await
    }

    /// Best rate for one day of a period, interpolating a missing day from
    /// its immediate neighbors when both exist.
    fn best_rate_for_day(
        rates_by_date: &BTreeMap<NaiveDate, Vec<Decimal>>,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Decimal, DomainError> {
        if let Some(rates) = rates_by_date.get(&date_of_exchange) {
            if !rates.is_empty() {
                return Self::pick_the_best(rates);
            }
        }

        let previous = rates_by_date
            .get(&(date_of_exchange - Duration::days(1)))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let next = rates_by_date
            .get(&(date_of_exchange + Duration::days(1)))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // Errors out if either neighbor is missing as well.
        let best_previous = Self::pick_the_best(previous)?;
        let best_next = Self::pick_the_best(next)?;

        tracing::warn!(
            date = %date_of_exchange,
            %currency,
            "using average of the previous and next day's rate"
        );
        Ok((best_previous + best_next) / Decimal::TWO)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Averaged rate
    // ─────────────────────────────────────────────────────────────────────────────

    async fn sums_for_period(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Vec<RateSum>, RepoError> {
        if currency == self.base_currency {
            return Ok(vec![base_rate_sum()]);
        }
        self.store
            .get_sum_of_rates_in_period(start_date, end_date, currency)
            .await
    }

    /// Joins the two sides' per-provider aggregates by provider identity.
    /// A base-currency side (one synthetic aggregate) pairs with every
    /// provider of the other side; two stored sides join on provider id.
    fn join_sums_by_provider(
        from_sums: &[RateSum],
        to_sums: &[RateSum],
        from_is_base: bool,
        to_is_base: bool,
    ) -> Vec<(RateSum, RateSum)> {
        if from_is_base {
            return to_sums
                .iter()
                .map(|to_sum| (base_rate_sum(), to_sum.clone()))
                .collect();
        }
        if to_is_base {
            return from_sums
                .iter()
                .map(|from_sum| (from_sum.clone(), base_rate_sum()))
                .collect();
        }

        let to_by_provider: HashMap<i32, &RateSum> =
            to_sums.iter().map(|t| (t.provider_id, t)).collect();
        from_sums
            .iter()
            .filter_map(|from_sum| {
                to_by_provider
                    .get(&from_sum.provider_id)
                    .map(|to_sum| (from_sum.clone(), (*to_sum).clone()))
            })
            .collect()
    }

    /// One averaged exchange rate over an inclusive span.
    ///
    /// A span starting in the future degrades to a single-day lookup at the
    /// clamped date. Providers missing days inside the span are tolerated
    /// with a warning; the first provider with usable sums on both sides
    /// decides the result.
    pub async fn get_average_exchange_rate_by_dates(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<Decimal, AppError> {
        let today_or_past_date = Self::future_date_to_today(start_date);
        if today_or_past_date != start_date {
            return self
                .get_exchange_rate_by_date(today_or_past_date, from_currency, to_currency)
                .await;
        }

        // Inclusive interval <start_date, end_date>.
        let number_of_days = (end_date - start_date).num_days().abs() + 1;
        let from_sums = self
            .sums_for_period(start_date, end_date, from_currency)
            .await?;
        let to_sums = self
            .sums_for_period(start_date, end_date, to_currency)
            .await?;

        let from_is_base = from_currency == self.base_currency;
        let to_is_base = to_currency == self.base_currency;

        for (from_sum, to_sum) in
            Self::join_sums_by_provider(&from_sums, &to_sums, from_is_base, to_is_base)
        {
            tracing::info!(
                %from_currency, from_count = from_sum.count, from_sum = %from_sum.sum,
                %to_currency, to_count = to_sum.count, to_sum = %to_sum.sum,
                start = %start_date, end = %end_date,
                "sums of currencies in period"
            );
            if from_sum.count != number_of_days && !from_is_base {
                tracing::warn!(
                    provider_id = from_sum.provider_id,
                    missing_days = number_of_days - from_sum.count,
                    %from_currency,
                    "provider is missing days in the requested range"
                );
            }
            if to_sum.count != number_of_days && !to_is_base {
                tracing::warn!(
                    provider_id = to_sum.provider_id,
                    missing_days = number_of_days - to_sum.count,
                    %to_currency,
                    "provider is missing days in the requested range"
                );
            }

            if from_sum.count > 0
                && !from_sum.sum.is_zero()
                && to_sum.count > 0
                && !to_sum.sum.is_zero()
            {
                let from_average = from_sum.sum / Decimal::from(from_sum.count);
                let to_average = to_sum.sum / Decimal::from(to_sum.count);
                if let Some(rate) = to_average.checked_div(from_average) {
                    return Ok(rate);
                }
            }
            tracing::error!("period count and/or sum are empty");
        }

        tracing::error!(%from_currency, %to_currency, "range request failed");
        Err(AppError::NotFound("Exchange rate not found".into()))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Interval set
    // ─────────────────────────────────────────────────────────────────────────────

    /// Daily, weekly and monthly rates anchored at one date: the point rate
    /// for the day plus averages over the trailing 7 and 31 days.
    pub async fn get_exchange_rate_in_intervals_by_date(
        &self,
        date_of_exchange: NaiveDate,
        from_currency: CurrencyCode,
        to_currency: CurrencyCode,
    ) -> Result<Vec<IntervalRate>, AppError> {
        let date_of_exchange = Self::future_date_to_today(date_of_exchange);

        let daily = self
            .get_exchange_rate_by_date(date_of_exchange, from_currency, to_currency)
            .await?;
        let weekly = self
            .get_average_exchange_rate_by_dates(
                date_of_exchange - Duration::days(6),
                date_of_exchange,
                from_currency,
                to_currency,
            )
            .await?;
        let monthly = self
            .get_average_exchange_rate_by_dates(
                date_of_exchange - Duration::days(30),
                date_of_exchange,
                from_currency,
                to_currency,
            )
            .await?;

        Ok(vec![
            IntervalRate {
                interval: Interval::Daily,
                exchange_rate: daily.to_string(),
            },
            IntervalRate {
                interval: Interval::Weekly,
                exchange_rate: weekly.to_string(),
            },
            IntervalRate {
                interval: Interval::Monthly,
                exchange_rate: monthly.to_string(),
            },
        ])
    }
}
