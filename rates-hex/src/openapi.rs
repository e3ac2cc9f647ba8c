//! OpenAPI specification and documentation.

#![allow(dead_code)] // Path functions are only used by utoipa for documentation generation

use rates_types::dto::{
    DateRateQuery, DateRateResponse, DateRatesResponse, DatedRate, Interval, IntervalRate,
    IntervalRatesResponse, RangeRateQuery, RangeRateResponse,
};
use utoipa::OpenApi;

// Dummy functions to generate path documentation
// These are not the actual handlers, just for OpenAPI path generation

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = inline(serde_json::Value), example = json!({"status": "healthy"}))
    )
)]
async fn health() {}

/// Exchange rate for a single date
#[utoipa::path(
    get,
    path = "/api/rate",
    tag = "rates",
    params(DateRateQuery),
    responses(
        (status = 200, description = "Exchange rate for the date", body = DateRateResponse),
        (status = 400, description = "Unknown or malformed currency code"),
        (status = 404, description = "No rate resolvable for the requested date")
    )
)]
async fn get_rate() {}

/// Daily exchange-rate series over a date range
#[utoipa::path(
    get,
    path = "/api/rates",
    tag = "rates",
    params(RangeRateQuery),
    responses(
        (status = 200, description = "Per-day rates; unresolvable days are omitted", body = DateRatesResponse),
        (status = 400, description = "Unknown or malformed currency code")
    )
)]
async fn get_rates() {}

/// Averaged exchange rate over a date range
#[utoipa::path(
    get,
    path = "/api/range",
    tag = "rates",
    params(RangeRateQuery),
    responses(
        (status = 200, description = "Averaged rate over the period", body = RangeRateResponse),
        (status = 400, description = "Unknown or malformed currency code"),
        (status = 404, description = "No usable data in the requested period")
    )
)]
async fn get_range() {}

/// Daily, weekly and monthly rates anchored at one date
#[utoipa::path(
    get,
    path = "/api/intervals",
    tag = "rates",
    params(DateRateQuery),
    responses(
        (status = 200, description = "Interval rates", body = IntervalRatesResponse),
        (status = 400, description = "Unknown or malformed currency code"),
        (status = 404, description = "No rate resolvable for the requested date")
    )
)]
async fn get_intervals() {}

/// OpenAPI documentation for the exchange-rate API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Exchange Rates Service API",
        version = "1.0.0",
        description = "Aggregates currency exchange rates from multiple providers, reconciles conflicting observations and serves consolidated point, series, averaged and interval rates.",
        license(name = "MIT"),
    ),
    paths(
        health,
        get_rate,
        get_rates,
        get_range,
        get_intervals,
    ),
    components(
        schemas(
            DateRateResponse,
            DatedRate,
            DateRatesResponse,
            RangeRateResponse,
            Interval,
            IntervalRate,
            IntervalRatesResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rates", description = "Exchange-rate queries"),
    )
)]
pub struct ApiDoc;
