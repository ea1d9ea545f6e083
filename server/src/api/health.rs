//! Liveness endpoint.

use axum::Json;
use serde_json::{json, Value};
use utoipa::OpenApi;

#[utoipa::path(
    get,
    path = "/health",
    tag = "ops",
    responses((status = 200, description = "Service is alive"))
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(OpenApi)]
#[openapi(paths(health))]
pub struct ApiDoc;
