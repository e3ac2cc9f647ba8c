//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use rates_types::{
    AppError, CurrencyCode, DateRateQuery, DateRateResponse, DateRatesResponse, DatedRate,
    IntervalRatesResponse, RangeRateQuery, RangeRateResponse, RateStore,
};

use crate::RateService;

/// Application state shared across handlers.
pub struct AppState<S: RateStore> {
    pub service: RateService<S>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Parses a currency parameter and checks it against the supported set.
fn parse_supported_currency<S: RateStore>(
    service: &RateService<S>,
    raw: &str,
) -> Result<CurrencyCode, AppError> {
    let currency: CurrencyCode = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid currency: {raw}")))?;
    if !service.is_supported(currency) {
        return Err(AppError::BadRequest(format!("Invalid currency: {raw}")));
    }
    Ok(currency)
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Single-date exchange rate.
#[tracing::instrument(skip(state), fields(from = %query.from, to = %query.to))]
pub async fn get_rate<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<DateRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from_currency = parse_supported_currency(&state.service, &query.from)?;
    let to_currency = parse_supported_currency(&state.service, &query.to)?;
    let date_of_exchange = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let exchange_rate = state
        .service
        .get_exchange_rate_by_date(date_of_exchange, from_currency, to_currency)
        .await?;

    Ok(Json(DateRateResponse {
        date: date_of_exchange.format("%Y-%m-%d").to_string(),
        from_currency: from_currency.to_string(),
        to_currency: to_currency.to_string(),
        exchange_rate: exchange_rate.to_string(),
    }))
}

/// Daily series over an inclusive date range.
///
/// Unresolvable days are absent from the series; the rest of the range still
/// answers with status 200.
#[tracing::instrument(skip(state), fields(from = %query.from, to = %query.to))]
pub async fn get_rates<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<RangeRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from_currency = parse_supported_currency(&state.service, &query.from)?;
    let to_currency = parse_supported_currency(&state.service, &query.to)?;

    let series = state
        .service
        .get_exchange_rates_by_dates(query.start_date, query.end_date, from_currency, to_currency)
        .await?;

    Ok(Json(DateRatesResponse {
        start_date: query.start_date.format("%Y-%m-%d").to_string(),
        end_date: query.end_date.format("%Y-%m-%d").to_string(),
        from_currency: from_currency.to_string(),
        to_currency: to_currency.to_string(),
        exchange_rates: series
            .into_iter()
            .map(|(date, exchange_rate)| DatedRate {
                date: date.format("%Y-%m-%d").to_string(),
                exchange_rate,
            })
            .collect(),
    }))
}

/// Averaged exchange rate over an inclusive date range.
#[tracing::instrument(skip(state), fields(from = %query.from, to = %query.to))]
pub async fn get_range<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<RangeRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from_currency = parse_supported_currency(&state.service, &query.from)?;
    let to_currency = parse_supported_currency(&state.service, &query.to)?;

    let exchange_rate = if query.start_date == query.end_date {
        state
            .service
            .get_exchange_rate_by_date(query.start_date, from_currency, to_currency)
            .await?
    } else {
        state
            .service
            .get_average_exchange_rate_by_dates(
                query.start_date,
                query.end_date,
                from_currency,
                to_currency,
            )
            .await?
    };

    Ok(Json(RangeRateResponse {
        start_date: query.start_date.format("%Y-%m-%d").to_string(),
        end_date: query.end_date.format("%Y-%m-%d").to_string(),
        from_currency: from_currency.to_string(),
        to_currency: to_currency.to_string(),
        exchange_rate: exchange_rate.to_string(),
    }))
}

/// Daily/weekly/monthly rates anchored at one date.
#[tracing::instrument(skip(state), fields(from = %query.from, to = %query.to))]
pub async fn get_intervals<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<DateRateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let from_currency = parse_supported_currency(&state.service, &query.from)?;
    let to_currency = parse_supported_currency(&state.service, &query.to)?;
    let date_of_exchange = query.date.unwrap_or_else(|| Utc::now().date_naive());

    let intervals = state
        .service
        .get_exchange_rate_in_intervals_by_date(date_of_exchange, from_currency, to_currency)
        .await?;

    Ok(Json(IntervalRatesResponse {
        date: date_of_exchange.format("%Y-%m-%d").to_string(),
        from_currency: from_currency.to_string(),
        to_currency: to_currency.to_string(),
        intervals,
    }))
}
