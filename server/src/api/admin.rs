//! Admin snapshot of the rate and cost gates, behind `x-admin-key`.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::api::ApiError;
use crate::state::SharedState;

#[utoipa::path(
    get,
    path = "/admin/stats",
    tag = "ops",
    responses(
        (status = 200, description = "Current gate snapshots"),
        (status = 403, description = "Admin key mismatch")
    )
)]
pub async fn stats(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let provided = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // No configured key means the endpoint is disabled outright.
    let expected = state.config.admin_api_key.as_deref().unwrap_or("");
    if expected.is_empty() || provided != expected {
        return Err(ApiError::Forbidden);
    }

    let cost = state.cost_gate.snapshot(&state.pool);
    Ok(Json(json!({
        "rate": {
            "standard": state.rate_standard.snapshot(),
            "strict": state.rate_strict.snapshot(),
        },
        "cost": cost,
        "inFlightAnalyses": state.single_flight.in_flight(),
    })))
}

#[derive(OpenApi)]
#[openapi(paths(stats))]
pub struct ApiDoc;
