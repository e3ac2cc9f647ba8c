//! Shared HTTP plumbing for vendor gateways.

use std::time::Duration;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use rates_types::ProviderError;

/// Connect and read timeout applied to every vendor call.
pub(crate) const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub(crate) fn default_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .connect_timeout(DEFAULT_REQUEST_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Request(e.to_string()))
}

/// GET returning the response body; any non-success status is an error.
pub(crate) async fn get_text(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::BadStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| ProviderError::Request(e.to_string()))
}

/// GET + JSON decode into the vendor's envelope type.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, ProviderError> {
    let body = get_text(client, url).await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::MalformedPayload(e.to_string()))
}

/// Lenient decimal parse for vendor payloads; bad values are logged and dropped.
pub(crate) fn to_decimal(value: &str, currency: Option<&str>) -> Option<Decimal> {
    match value.trim().parse::<Decimal>() {
        Ok(decimal_value) => Some(decimal_value),
        Err(_) => {
            tracing::error!(value, currency, "value is not a number");
            None
        }
    }
}
