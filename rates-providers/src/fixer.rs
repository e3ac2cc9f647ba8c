//! Fixer gateway.
//!
//! The free subscription pins the vendor base to EUR, so every rate has to
//! be re-based to the configured base currency before leaving the gateway.
//! Monthly quota as with CurrencyLayer.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use rates_types::{CurrencyCode, ProviderError, RateProvider};

use crate::http;

const BASE_URL: &str = "http://data.fixer.io/api";

/// Vendor error code for an exhausted monthly quota.
const QUOTA_EXCEEDED: i64 = 104;

pub struct Fixer {
    client: reqwest::Client,
    base_currency: CurrencyCode,
    access_key: String,
    limit_reached: AtomicBool,
    /// Supported-currency memo, keyed by date: the vendor refuses dates it
    /// considers future, and that outcome must not be cached.
    supported: Mutex<Option<(NaiveDate, HashSet<CurrencyCode>)>>,
}

#[derive(Debug, Deserialize)]
struct FixerResponse {
    success: bool,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
    error: Option<FixerError>,
}

#[derive(Debug, Deserialize)]
struct FixerError {
    code: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl Fixer {
    pub fn new(
        base_currency: CurrencyCode,
        access_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let access_key = access_key.unwrap_or_default();
        if access_key.is_empty() {
            tracing::error!("fixer.io access key is missing, requests will be rejected");
        }
        Ok(Self {
            client: http::default_client()?,
            base_currency,
            access_key,
            limit_reached: AtomicBool::new(false),
            supported: Mutex::new(None),
        })
    }

    /// Converts an EUR-based vendor rate into a base-currency rate.
    fn rebase(base_currency_rate: Decimal, currency_rate: Decimal) -> Option<Decimal> {
        currency_rate.checked_div(base_currency_rate)
    }

    async fn fetch_day(
        &self,
        date_of_exchange: NaiveDate,
        symbols: Option<&str>,
    ) -> Result<FixerResponse, ProviderError> {
        if self.limit_reached.load(Ordering::Relaxed) {
            tracing::warn!("fixer.io API limit was exceeded, rate won't be requested");
            return Ok(FixerResponse {
                success: false,
                rates: HashMap::new(),
                error: None,
            });
        }

        let mut url = format!(
            "{BASE_URL}/{}?access_key={}",
            date_of_exchange.format("%Y-%m-%d"),
            self.access_key,
        );
        if let Some(symbols) = symbols {
            url.push_str("&symbols=");
            url.push_str(symbols);
        }

        let response: FixerResponse = http::get_json(&self.client, &url).await?;
        if !response.success {
            if let Some(error) = &response.error {
                if error.code == Some(QUOTA_EXCEEDED) {
                    self.limit_reached.store(true, Ordering::Relaxed);
                }
            }
        }
        Ok(response)
    }
}

#[async_trait::async_trait]
impl RateProvider for Fixer {
    fn name(&self) -> &str {
        "fixer.io"
    }

    fn has_request_limit(&self) -> bool {
        true
    }

    fn reset_request_limit(&self) {
        self.limit_reached.store(false, Ordering::Relaxed);
    }

    async fn get_supported_currencies(
        &self,
        date_of_exchange: NaiveDate,
    ) -> Result<HashSet<CurrencyCode>, ProviderError> {
        if let Some((memo_date, memo)) = self.supported.lock().unwrap().as_ref() {
            if *memo_date == date_of_exchange {
                return Ok(memo.clone());
            }
        }

        let response = self.fetch_day(date_of_exchange, None).await?;
        if !response.success {
            if let Some(error) = &response.error {
                // The vendor rejects dates it considers future (e.g. right
                // after midnight); that answer must not be memoized.
                if error.kind.as_deref() == Some("invalid_date") {
                    return Ok(HashSet::new());
                }
                tracing::error!(
                    code = error.code,
                    kind = error.kind.as_deref().unwrap_or(""),
                    date = %date_of_exchange,
                    "fixer.io supported currencies not found"
                );
            }
            return Ok(HashSet::new());
        }

        let currencies: HashSet<CurrencyCode> = response
            .rates
            .keys()
            .filter_map(|key| key.parse().ok())
            .collect();

        if !currencies.is_empty() {
            tracing::debug!(count = currencies.len(), "fixer.io supported currencies");
            *self.supported.lock().unwrap() = Some((date_of_exchange, currencies.clone()));
        }
        Ok(currencies)
    }

    async fn get_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Option<Decimal>, ProviderError> {
        tracing::debug!(%currency, date = %date_of_exchange, "requesting fixer.io");

        let symbols = format!("{},{currency}", self.base_currency);
        let response = self.fetch_day(date_of_exchange, Some(&symbols)).await?;
        if !response.success {
            tracing::error!(date = %date_of_exchange, "fixer.io unsuccessful response");
            return Ok(None);
        }

        let base_rate = response.rates.get(self.base_currency.as_str());
        let currency_rate = response.rates.get(currency.as_str());
        match (base_rate, currency_rate) {
            (Some(base_rate), Some(currency_rate)) => {
                Ok(Self::rebase(*base_rate, *currency_rate))
            }
            _ => Ok(None),
        }
    }

    async fn get_all_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
        tracing::debug!(date = %date_of_exchange, "fixer.io - get all for date");

        let response = self.fetch_day(date_of_exchange, None).await?;
        if !response.success {
            tracing::error!(date = %date_of_exchange, "fixer.io unsuccessful response");
            return Ok(HashMap::new());
        }

        let Some(base_currency_rate) = response.rates.get(self.base_currency.as_str()).copied()
        else {
            return Ok(HashMap::new());
        };

        let mut day_rates = HashMap::new();
        for currency in currencies {
            if let Some(rate_in_eur) = response.rates.get(currency.as_str()) {
                if let Some(rate) = Self::rebase(base_currency_rate, *rate_in_eur) {
                    day_rates.insert(*currency, rate);
                }
            }
        }
        Ok(day_rates)
    }

    async fn get_historical(
        &self,
        origin_date: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>>, ProviderError> {
        let today = Utc::now().date_naive();
        let mut date_of_exchange = origin_date.min(today);

        let mut historical_rates: BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>> =
            BTreeMap::new();
        while date_of_exchange < today {
            match self.get_all_by_date(date_of_exchange, currencies).await {
                Ok(day_rates) if !day_rates.is_empty() => {
                    historical_rates.insert(date_of_exchange, day_rates);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(date = %date_of_exchange, %err, "fixer.io day request failed")
                }
            }
            date_of_exchange = date_of_exchange + Duration::days(1);
        }
        Ok(historical_rates)
    }
}
