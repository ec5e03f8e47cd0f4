//! API route definitions.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

use super::state::AppState;
use super::ApiError;
use crate::incident::filter::FilterQuery;
use crate::incident::{filter, summarize, FilterCriteria, IncidentFields, NewIncident};

type ApiResult<T> = Result<T, ApiError>;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/incidents", get(list_incidents).post(create_incident))
        .route("/incidents/live", get(live_incidents))
        .route("/incidents/{id}", get(get_incident))
        .route("/incidents/{id}/acknowledge", post(acknowledge_incident))
        .route("/incidents/{id}/resolve", post(resolve_incident))
        .route("/stats", get(stats))
        .route("/monitoring", get(monitoring_status))
        .route("/monitoring/start", post(start_monitoring))
        .route("/monitoring/stop", post(stop_monitoring))
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> ApiResult<Json<Value>> {
    let criteria = FilterCriteria::try_from(query)?;
    let snapshot = state.store.list_all().await;
    let view = filter(&snapshot, &criteria);
    Ok(Json(json!({
        "data": view,
        "meta": { "total": view.len(), "unfiltered_total": snapshot.len() }
    })))
}

async fn create_incident(
    State(state): State<AppState>,
    payload: Result<Json<IncidentFields>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(fields) = payload?;
    let new = NewIncident::try_from(fields)?;
    let incident = state.store.create(new).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": incident }))))
}

async fn live_incidents(State(state): State<AppState>) -> Json<Value> {
    let live = state.store.live().await;
    Json(json!({
        "data": live,
        "meta": { "total": live.len(), "window": state.store.live_window() }
    }))
}

async fn get_incident(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let incident = state.store.get(id).await?;
    Ok(Json(json!({ "data": incident })))
}

async fn acknowledge_incident(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let incident = state.store.acknowledge(id).await?;
    Ok(Json(json!({ "data": incident })))
}

async fn resolve_incident(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let incident = state.store.resolve(id).await?;
    Ok(Json(json!({ "data": incident })))
}

async fn stats(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.store.list_all().await;
    Json(json!({
        "data": summarize(&snapshot),
        "meta": { "timestamp": chrono::Utc::now().to_rfc3339() }
    }))
}

async fn monitoring_status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "data": state.monitor.status().await }))
}

async fn start_monitoring(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let changed = state.monitor.start().await?;
    Ok(Json(json!({
        "data": state.monitor.status().await,
        "meta": { "changed": changed }
    })))
}

async fn stop_monitoring(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let changed = state.monitor.stop().await?;
    Ok(Json(json!({
        "data": state.monitor.status().await,
        "meta": { "changed": changed }
    })))
}
