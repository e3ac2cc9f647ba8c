//! CurrencyLayer gateway.
//!
//! Real-time JSON service with a free plan of 1000 requests per month, so
//! `has_request_limit` is set and the gateway latches itself off once the
//! vendor reports the quota error. The vendor's implicit base is USD and
//! quote keys are `USD<CCY>`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use rates_types::{CurrencyCode, ProviderError, RateProvider};

use crate::http;

const BASE_URL: &str = "http://www.apilayer.net/api/live";
const VENDOR_BASE: &str = "USD";

/// Vendor error code for an exhausted monthly quota.
const QUOTA_EXCEEDED: i64 = 104;

pub struct CurrencyLayer {
    client: reqwest::Client,
    access_key: String,
    limit_reached: AtomicBool,
    supported: Mutex<Option<HashSet<CurrencyCode>>>,
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    success: bool,
    #[serde(default)]
    quotes: HashMap<String, Decimal>,
    error: Option<LiveError>,
}

#[derive(Debug, Deserialize)]
struct LiveError {
    code: Option<i64>,
    info: Option<String>,
}

impl CurrencyLayer {
    pub fn new(
        _base_currency: CurrencyCode,
        access_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let access_key = access_key.unwrap_or_default();
        if access_key.is_empty() {
            tracing::error!("currency_layer access key is missing, requests will be rejected");
        }
        Ok(Self {
            client: http::default_client()?,
            access_key,
            limit_reached: AtomicBool::new(false),
            supported: Mutex::new(None),
        })
    }

    /// Strips the vendor's USD prefix off a quote key like `USDEUR`.
    fn currency_from_quote_key(key: &str) -> Option<CurrencyCode> {
        key.strip_prefix(VENDOR_BASE)?.parse().ok()
    }

    async fn fetch_quotes(
        &self,
        date_of_exchange: NaiveDate,
        currencies: Option<&str>,
    ) -> Result<HashMap<String, Decimal>, ProviderError> {
        if self.limit_reached.load(Ordering::Relaxed) {
            tracing::warn!("currency_layer API limit was exceeded, rate won't be requested");
            return Ok(HashMap::new());
        }

        let mut url = format!(
            "{BASE_URL}?access_key={}&date={}",
            self.access_key,
            date_of_exchange.format("%Y-%m-%d"),
        );
        if let Some(currencies) = currencies {
            url.push_str("&currencies=");
            url.push_str(currencies);
        }

        let response: LiveResponse = http::get_json(&self.client, &url).await?;
        if !response.success {
            let error = response.error.unwrap_or(LiveError { code: None, info: None });
            if error.code == Some(QUOTA_EXCEEDED) {
                self.limit_reached.store(true, Ordering::Relaxed);
            }
            tracing::warn!(
                code = error.code,
                info = error.info.as_deref().unwrap_or(""),
                "currency_layer unsuccessful request"
            );
            return Ok(HashMap::new());
        }
        Ok(response.quotes)
    }
}

#[async_trait::async_trait]
impl RateProvider for CurrencyLayer {
    fn name(&self) -> &str {
        "currency_layer"
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
        if let Some(memo) = self.supported.lock().unwrap().as_ref() {
            return Ok(memo.clone());
        }

        let quotes = self.fetch_quotes(date_of_exchange, None).await?;
        let currencies: HashSet<CurrencyCode> = quotes
            .keys()
            .filter_map(|key| Self::currency_from_quote_key(key))
            .collect();

        if currencies.is_empty() {
            tracing::error!("currency_layer supported currencies not found");
        } else {
            tracing::debug!(count = currencies.len(), "currency_layer supported currencies");
            *self.supported.lock().unwrap() = Some(currencies.clone());
        }
        Ok(currencies)
    }

    async fn get_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Option<Decimal>, ProviderError> {
        tracing::debug!(%currency, date = %date_of_exchange, "requesting currency_layer");

        let quotes = self
            .fetch_quotes(date_of_exchange, Some(currency.as_str()))
            .await?;
        Ok(quotes.get(&format!("{VENDOR_BASE}{currency}")).copied())
    }

    async fn get_all_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
        let joined = currencies
            .iter()
            .map(CurrencyCode::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let quotes = self.fetch_quotes(date_of_exchange, Some(&joined)).await?;

        Ok(quotes
            .iter()
            .filter_map(|(key, rate)| Self::currency_from_quote_key(key).map(|c| (c, *rate)))
            .collect())
    }

    async fn get_historical(
        &self,
        origin_date: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>>, ProviderError> {
        let today = Utc::now().date_naive();
        let mut date_of_exchange = origin_date.min(today);

        let mut day_rates: BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>> = BTreeMap::new();
        while date_of_exchange < today {
            match self.get_all_by_date(date_of_exchange, currencies).await {
                Ok(rates) if !rates.is_empty() => {
                    day_rates.insert(date_of_exchange, rates);
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(date = %date_of_exchange, %err, "currency_layer day request failed")
                }
            }
            date_of_exchange = date_of_exchange + Duration::days(1);
        }
        Ok(day_rates)
    }
}
