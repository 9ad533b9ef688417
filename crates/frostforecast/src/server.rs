use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use frost_core::domain::Domain;
use frost_core::error::{FrostError, Result};
use frost_core::filter::{KeyFilter, TimeWindow};
use frost_core::query::{RunTrigger, RunsRequest, UsageRequest};
use frost_core::time::parse_time_or_relative;
use frost_engine::refresh::refresh_domain;
use frost_store::Store;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Level;

#[derive(Clone)]
struct AppState {
    store: Store,
    lookback_days: u32,
}

pub async fn run_status_server(store: Store, addr: SocketAddr, lookback_days: u32) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| FrostError::Io(format!("bind status listener: {e}")))?;
    axum::serve(listener, router(store, lookback_days))
        .await
        .map_err(|e| FrostError::Io(format!("status server failed: {e}")))
}

pub fn router(store: Store, lookback_days: u32) -> Router {
    let state = AppState {
        store,
        lookback_days,
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);
    Router::new()
        .route("/v1/status", get(get_status))
        .route("/v1/runs", get(get_runs))
        .route("/v1/usage/{domain}", get(get_usage))
        .route("/v1/refresh/{domain}", post(post_refresh))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .on_request(tower_http::trace::DefaultOnRequest::new().level(Level::INFO))
                .on_response(tower_http::trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct RunsParams {
    domain: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct UsageParams {
    since: Option<String>,
    until: Option<String>,
    key: Option<String>,
    limit: Option<usize>,
}

async fn get_status(State(state): State<AppState>) -> Response {
    to_response(state.store.status())
}

async fn get_runs(State(state): State<AppState>, Query(params): Query<RunsParams>) -> Response {
    let domain = match params.domain.as_deref().map(str::parse::<Domain>).transpose() {
        Ok(v) => v,
        Err(err) => return bad_request(err),
    };
    let req = RunsRequest {
        domain,
        limit: params.limit.unwrap_or(20),
    };
    to_response(state.store.recent_runs(&req))
}

async fn get_usage(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    Query(params): Query<UsageParams>,
) -> Response {
    let req = match usage_request(&domain, &params) {
        Ok(req) => req,
        Err(err) => return bad_request(err),
    };
    to_response(state.store.usage_rows(&req))
}

/// Manual refresh against the live instance. Runs on the blocking pool so a
/// long backfill does not stall the other routes.
async fn post_refresh(State(state): State<AppState>, Path(domain): Path<String>) -> Response {
    let domain: Domain = match domain.parse() {
        Ok(v) => v,
        Err(err) => return bad_request(err),
    };
    let store = state.store.clone();
    let lookback_days = state.lookback_days;
    let outcome = tokio::task::spawn_blocking(move || {
        refresh_domain(&store, domain, RunTrigger::Manual, lookback_days)
    })
    .await;
    match outcome {
        Ok(result) => to_response(result),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

fn usage_request(domain: &str, params: &UsageParams) -> Result<UsageRequest> {
    let domain: Domain = domain.parse()?;
    let since = params
        .since
        .as_deref()
        .map(parse_time_or_relative)
        .transpose()?;
    let until = params
        .until
        .as_deref()
        .map(parse_time_or_relative)
        .transpose()?;
    let key = params.key.as_deref().map(KeyFilter::parse).transpose()?;
    Ok(UsageRequest {
        domain,
        window: TimeWindow { since, until },
        key,
        limit: params.limit.unwrap_or(100),
    })
}

fn to_response<T: serde::Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(v) => Json(v).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({"error": err.to_string()})),
        )
            .into_response(),
    }
}

fn bad_request(err: FrostError) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}
