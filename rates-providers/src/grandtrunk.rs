//! GrandTrunk gateway.
//!
//! Plain-text API serving day rates based on the Federal Reserve and the
//! European Central Bank. Free for low-volume use; no request quota, which
//! also makes it the only gateway eligible for reactive historical backfill.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use rates_types::{CurrencyCode, ProviderError, RateProvider};

use crate::http;

const BASE_URL: &str = "http://currencies.apps.grandtrunk.net";

pub struct GrandTrunk {
    client: reqwest::Client,
    base_currency: CurrencyCode,
    /// Memo of the last supported-currency answer, keyed by request date.
    supported: Mutex<Option<(NaiveDate, HashSet<CurrencyCode>)>>,
}

impl GrandTrunk {
    pub fn new(base_currency: CurrencyCode) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http::default_client()?,
            base_currency,
            supported: Mutex::new(None),
        })
    }

    /// Parses one `YYYY-MM-DD <rate>` line of a `/getrange` response.
    fn parse_range_line(line: &str) -> Option<(NaiveDate, &str)> {
        let (date_part, rate_part) = line.split_once(' ')?;
        let day = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
        Some((day, rate_part))
    }
}

#[async_trait::async_trait]
impl RateProvider for GrandTrunk {
    fn name(&self) -> &str {
        "grandtrunk"
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

        let url = format!("{BASE_URL}/currencies/{}", date_of_exchange.format("%Y-%m-%d"));
        let body = http::get_text(&self.client, &url).await?;
        let currencies: HashSet<CurrencyCode> = body
            .lines()
            .filter_map(|line| line.trim().parse().ok())
            .collect();

        if currencies.is_empty() {
            tracing::error!("grandtrunk supported currencies not found");
        } else {
            tracing::debug!(count = currencies.len(), "grandtrunk supported currencies");
            *self.supported.lock().unwrap() = Some((date_of_exchange, currencies.clone()));
        }
        Ok(currencies)
    }

    async fn get_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currency: CurrencyCode,
    ) -> Result<Option<Decimal>, ProviderError> {
        let date_str = date_of_exchange.format("%Y-%m-%d").to_string();
        tracing::debug!(%currency, date = %date_str, "requesting grandtrunk");

        let url = format!("{BASE_URL}/getrate/{date_str}/{}/{currency}", self.base_currency);
        let body = http::get_text(&self.client, &url).await?;
        Ok(http::to_decimal(&body, Some(currency.as_str())))
    }

    async fn get_all_by_date(
        &self,
        date_of_exchange: NaiveDate,
        currencies: &HashSet<CurrencyCode>,
    ) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
        let supported = self.get_supported_currencies(date_of_exchange).await?;

        let mut day_rates = HashMap::new();
        for currency in currencies {
            if !supported.contains(currency) {
                continue;
            }
            match self.get_by_date(date_of_exchange, *currency).await {
                Ok(Some(rate)) => {
                    day_rates.insert(*currency, rate);
                }
                Ok(None) => {}
                Err(err) => tracing::error!(%currency, %err, "grandtrunk day-rate request failed"),
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
        let origin_str = origin_date.format("%Y-%m-%d").to_string();

        let mut day_rates: BTreeMap<NaiveDate, HashMap<CurrencyCode, Decimal>> = BTreeMap::new();
        for currency in currencies {
            let url = format!(
                "{BASE_URL}/getrange/{origin_str}/{}/{}/{currency}",
                today.format("%Y-%m-%d"),
                self.base_currency,
            );
            let body = match http::get_text(&self.client, &url).await {
                Ok(body) => body,
                Err(err) => {
                    tracing::error!(%currency, %err, "grandtrunk range request failed");
                    continue;
                }
            };

            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match Self::parse_range_line(line) {
                    Some((day, raw_rate)) => {
                        if let Some(rate) = http::to_decimal(raw_rate, Some(currency.as_str())) {
                            day_rates.entry(day).or_default().insert(*currency, rate);
                        }
                    }
                    None => tracing::error!(line, "grandtrunk range record parsing failed"),
                }
            }
        }
        Ok(day_rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_range_line() {
        let (day, rate) = GrandTrunk::parse_range_line("2016-02-17 0.88").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2016, 2, 17).unwrap());
        assert_eq!(http::to_decimal(rate, None), Some(dec!(0.88)));
    }

    #[test]
    fn test_parse_range_line_rejects_bad_records() {
        assert!(GrandTrunk::parse_range_line("2016-02-17").is_none());
        assert!(GrandTrunk::parse_range_line("not-a-date 0.88").is_none());
    }
}
