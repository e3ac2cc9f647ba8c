//! Configuration loading from environment.

use std::collections::HashSet;
use std::env;

use rates_providers::ProviderSecrets;
use rates_types::{CurrencyCode, DEFAULT_SUPPORTED_CURRENCIES};

/// Application configuration.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub base_currency: CurrencyCode,
    pub supported_currencies: HashSet<CurrencyCode>,
    pub secrets: ProviderSecrets,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let base_currency: CurrencyCode = env::var("BASE_CURRENCY")
            .unwrap_or_else(|_| "USD".to_string())
            .parse()?;

        let supported_currencies = match env::var("SUPPORTED_CURRENCIES") {
            Ok(raw) => raw
                .split(',')
                .map(|code| code.trim().parse::<CurrencyCode>())
                .collect::<Result<HashSet<_>, _>>()?,
            Err(_) => DEFAULT_SUPPORTED_CURRENCIES
                .iter()
                .filter_map(|code| code.parse().ok())
                .collect(),
        };

        let secrets = ProviderSecrets {
            currency_layer_access_key: env::var("CURRENCY_LAYER_ACCESS_KEY").ok(),
            fixer_access_key: env::var("FIXER_ACCESS_KEY").ok(),
        };

        Ok(Self {
            port,
            database_url,
            base_currency,
            supported_currencies,
            secrets,
        })
    }
}
