//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};

use rates_types::{
    AppError, Endpoint, ProviderCode, RateRequest, RateStore, RatesFailure, RatesQuery,
    RatesSuccess,
};

use crate::RatesService;

/// Application state shared across handlers.
pub struct AppState<S: RateStore> {
    pub service: RatesService<S>,
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
        let status = match &self.0 {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = RatesFailure::new(status.as_u16(), self.0.to_string());
        (status, Json(body)).into_response()
    }
}

/// Liveness endpoint.
pub async fn status() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Success" }))
}

/// Decodes the provider segment and query surface shared by both rate
/// endpoints. Symbols are canonicalized later, inside [`RateRequest::new`].
fn decode(
    raw_provider: &str,
    query: &RatesQuery,
) -> Result<(ProviderCode, String, Vec<String>), AppError> {
    let provider: ProviderCode = raw_provider
        .parse()
        .map_err(|_| AppError::BadRequest(format!("unknown provider: {}", raw_provider)))?;

    let base = query
        .base
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_ascii_uppercase();
    if base.len() != 3 || !base.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(AppError::BadRequest(
            "base must be a three-letter currency code".into(),
        ));
    }

    let symbols = query.symbol_list();
    if symbols.is_empty() {
        return Err(AppError::BadRequest("symbols must not be empty".into()));
    }

    Ok((provider, base, symbols))
}

/// Serves one finalized daily table.
#[tracing::instrument(skip(state, query), fields(provider = %provider, date = %date))]
pub async fn historical_rates<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Path((provider, date)): Path<(String, String)>,
    Query(query): Query<RatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (code, base, symbols) = decode(&provider, &query)?;
    let mut rate_date: NaiveDate = date.parse().map_err(|_| {
        AppError::BadRequest(format!("invalid date: {} (expected YYYY-MM-DD)", date))
    })?;

    // The provider-local today has no finalized table yet; serve yesterday's.
    let descriptor = state.service.descriptor(code);
    if rate_date == descriptor.today_local() {
        rate_date -= chrono::Duration::days(1);
    }

    let request = RateRequest::new(
        Endpoint::Historical,
        code,
        descriptor.location,
        rate_date,
        base,
        symbols,
        query.force_flag(),
    );
    let response = state.service.get_rates(&request).await?;
    Ok(Json(RatesSuccess::from_parts(&request, &response)))
}

/// Serves the freshest rates the provider can answer for right now.
#[tracing::instrument(skip(state, query), fields(provider = %provider))]
pub async fn latest_rates<S: RateStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(provider): Path<String>,
    Query(query): Query<RatesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (code, base, symbols) = decode(&provider, &query)?;

    // Which concrete (endpoint, date) "latest" means right now is the
    // provider's call: a scraped table that is not final yet falls back to
    // yesterday's historical one.
    let (endpoint, rate_date) = state.service.registry().get(code).latest_target(Utc::now());

    let request = RateRequest::new(
        endpoint,
        code,
        state.service.descriptor(code).location,
        rate_date,
        base,
        symbols,
        query.force_flag(),
    );
    let response = state.service.get_rates(&request).await?;
    Ok(Json(RatesSuccess::from_parts(&request, &response)))
}
