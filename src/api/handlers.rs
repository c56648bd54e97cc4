use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::aggregator::{RefreshOutcome, SnapshotState};

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

// ============================================================
// Health & Networks
// ============================================================

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<HealthResponse> {
    let (status, last_generation, last_refreshed_at) = match state.aggregator.current() {
        SnapshotState::Pending => ("pending", None, None),
        SnapshotState::Ready(view) => ("ok", Some(view.generation), Some(view.refreshed_at)),
        SnapshotState::Failed { generation, .. } => ("degraded", Some(generation), None),
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        networks: state.aggregator.networks().count(),
        last_generation,
        last_refreshed_at,
    }))
}

pub async fn networks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<NetworkInfo>> {
    Ok(Json(state.aggregator.networks().map(NetworkInfo::from).collect()))
}

// ============================================================
// Portfolio
// ============================================================

pub async fn portfolio(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PortfolioParams>,
) -> ApiResult<PortfolioResponse> {
    let view = match state.aggregator.current() {
        SnapshotState::Ready(view) => view,
        SnapshotState::Pending => {
            return Err(api_error(StatusCode::NOT_FOUND, "No balance refresh has completed yet"))
        }
        SnapshotState::Failed { message, .. } => {
            return Err(api_error(StatusCode::SERVICE_UNAVAILABLE, message))
        }
    };

    if let Some(ref network) = params.network {
        if !state.aggregator.networks().any(|n| &n.name == network) {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Unknown network: {}", network),
            ));
        }
    }

    let selected = view.select(params.network.as_deref(), params.wallet.as_deref());
    Ok(Json(PortfolioResponse::build(&selected, state.aggregator.networks())))
}

pub async fn refresh_portfolio(
    State(state): State<Arc<AppState>>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<PortfolioResponse> {
    let Json(request) = body.unwrap_or_default();
    let addresses = if request.addresses.is_empty() {
        state.default_addresses.clone()
    } else {
        request.addresses
    };

    match state.aggregator.refresh(&addresses).await {
        Ok(RefreshOutcome::Published(view)) => {
            Ok(Json(PortfolioResponse::build(&view, state.aggregator.networks())))
        }
        Ok(RefreshOutcome::Superseded { generation }) => Err(api_error(
            StatusCode::CONFLICT,
            format!("Refresh {} was superseded by a newer refresh", generation),
        )),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

// ============================================================
// Prices
// ============================================================

pub async fn prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PriceParams>,
) -> ApiResult<PricesResponse> {
    let symbols: Vec<&str> = params
        .symbols
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "No symbols given"));
    }

    let prices = state.aggregator.prices().get_prices(&symbols).await;
    Ok(Json(PricesResponse {
        prices: prices.into_iter().collect(),
    }))
}
