use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::Value;
use tracing::debug;

use crate::error::BackendError;
use crate::memory::{ServiceBackends, ServiceSnapshot};

/// Static path answered as soon as the listener is up; used as the
/// readiness probe target.
pub const PROBE_PATH: &str = "/static";

type SharedBackends = Arc<ServiceBackends>;

pub fn build_router(backends: SharedBackends) -> Router {
    Router::new()
        .route(PROBE_PATH, get(probe))
        .route("/_mock/state", get(state))
        .route("/_mock/reset", post(reset))
        .route("/{region}/resources", get(list_resources))
        .route(
            "/{region}/resources/{key}",
            get(get_resource).put(put_resource).delete(delete_resource),
        )
        .with_state(backends)
}

async fn probe() -> &'static str {
    "ok"
}

async fn state(
    State(backends): State<SharedBackends>,
) -> Json<ServiceSnapshot> {
    Json(backends.snapshot())
}

async fn reset(State(backends): State<SharedBackends>) -> StatusCode {
    debug!(service = backends.name(), "reset via http");
    backends.reset_all();
    StatusCode::NO_CONTENT
}

fn check_region(region: &str) -> Result<(), BackendError> {
    if region.starts_with('_') {
        return Err(BackendError::InvalidRegion(region.to_string()));
    }
    Ok(())
}

async fn list_resources(
    Path(region): Path<String>,
    State(backends): State<SharedBackends>,
) -> Result<Json<Vec<String>>, BackendError> {
    check_region(&region)?;
    let backend = backends.region(&region);
    backend.record_call();
    Ok(Json(backend.keys()))
}

async fn get_resource(
    Path((region, key)): Path<(String, String)>,
    State(backends): State<SharedBackends>,
) -> Result<Json<Value>, BackendError> {
    check_region(&region)?;
    let backend = backends.region(&region);
    backend.record_call();
    backend
        .get(&key)
        .map(Json)
        .ok_or(BackendError::NotFound { region, key })
}

async fn put_resource(
    Path((region, key)): Path<(String, String)>,
    State(backends): State<SharedBackends>,
    Json(body): Json<Value>,
) -> Result<StatusCode, BackendError> {
    check_region(&region)?;
    let backend = backends.region(&region);
    backend.record_call();
    if backend.put(&key, body) {
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::OK)
    }
}

async fn delete_resource(
    Path((region, key)): Path<(String, String)>,
    State(backends): State<SharedBackends>,
) -> Result<StatusCode, BackendError> {
    check_region(&region)?;
    let backend = backends.region(&region);
    backend.record_call();
    if backend.delete(&key) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(BackendError::NotFound { region, key })
    }
}
