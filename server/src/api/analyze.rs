//! POST /analyze: turn a video URL into a persisted recipe.
//!
//! Admission order is fixed: authenticate, rate gate, cost gate, validate,
//! owner-duplicate lookup, single-flight acquire, global-duplicate lookup,
//! quota check, pipeline, persist, debit. The single-flight guard covers
//! everything after acquisition and releases on every exit path.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use cocotte_core::types::{normalize_url, Language};
use serde::Deserialize;
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

use crate::api::client_ip::ClientIp;
use crate::api::{ApiError, RecipeResponse};
use crate::auth::AuthUser;
use crate::db;
use crate::models::GenerationMode;
use crate::persistence::{recipes, thumbnails};
use crate::state::SharedState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// Source video URL. Required; validated by hand so the error code is
    /// ours rather than a deserializer rejection.
    #[serde(default)]
    pub url: Value,
    #[serde(default)]
    pub language: Option<String>,
}

/// Parse the optional language field; absent defaults to French.
pub(crate) fn parse_language(raw: Option<&str>) -> Result<Language, ApiError> {
    match raw {
        None => Ok(Language::default()),
        Some(value) => Language::from_str(value).ok_or_else(ApiError::invalid_language),
    }
}

#[utoipa::path(
    post,
    path = "/analyze",
    tag = "recipes",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Recipe extracted or already known", body = crate::api::RecipeResponse),
        (status = 400, description = "Invalid input or not a recipe"),
        (status = 401, description = "Authentication failure"),
        (status = 403, description = "Free generations exhausted"),
        (status = 429, description = "Rate, cost or single-flight denial"),
        (status = 503, description = "Server overloaded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn analyze(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Response, ApiError> {
    // Rate gate: global -> IP -> user. Denials carry Retry-After.
    let rate = state
        .rate_standard
        .check(&state.pool, &user.id.to_string(), &ip)?;

    // Cost gate; store errors fail open inside.
    state.cost_gate.admit(&state.pool, user.id)?;

    // Input validation.
    let language = parse_language(request.language.as_deref())?;
    let url = request
        .url
        .as_str()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::url_missing(language))?;
    let normalized = normalize_url(url);

    // Owner duplicate: return it untouched, quota stays as it is.
    let mut conn = db::conn(&state.pool)?;
    if let Some(existing) = recipes::find_owned_by_source(&mut conn, user.id, normalized)? {
        tracing::info!(user_id = %user.id, recipe_id = %existing.id, "owner duplicate hit");
        let hydrated = recipes::hydrate(&mut conn, existing)?;
        return Ok(RecipeResponse::new(hydrated, user.id)
            .already_exists()
            .into_response_with(Some(&rate)));
    }

    // Single flight: one analysis per user; the guard releases on drop.
    let _guard = state
        .single_flight
        .try_acquire(user.id, normalized)
        .map_err(|locked_url| ApiError::AnalysisInProgress {
            locked_url,
        })?;

    // Global duplicate: clone for this owner instead of re-analyzing.
    // Cloning is billable, so the quota gate runs first.
    if let Some(other_owners) = recipes::find_any_by_source(&mut conn, normalized)? {
        let quota = crate::admission::quota::can_generate(&mut conn, user.id)?;
        if !quota.allowed {
            return Err(ApiError::premium_required(language));
        }
        let mode = if quota.is_premium {
            GenerationMode::Premium
        } else {
            GenerationMode::Free
        };
        let cloned = recipes::clone_for_owner(&mut conn, &other_owners, user.id, mode)?;
        if !quota.is_premium {
            crate::admission::quota::debit(&mut conn, user.id);
        }
        tracing::info!(
            user_id = %user.id,
            source_recipe = %other_owners.id,
            recipe_id = %cloned.recipe.id,
            "cross-user duplicate cloned"
        );
        return Ok(RecipeResponse::new(cloned, user.id)
            .already_exists()
            .duplicated()
            .into_response_with(Some(&rate)));
    }

    // Quota check before any provider spend.
    let quota = crate::admission::quota::can_generate(&mut conn, user.id)?;
    if !quota.allowed {
        return Err(ApiError::premium_required(language));
    }
    // The pipeline can run for a while; no reason to sit on a connection.
    drop(conn);

    let output = state.pipeline.analyze(url, language).await?;

    // Thumbnail persistence is best-effort; the recipe proceeds without.
    let image_url = match output.metadata.as_ref().and_then(|m| m.thumbnail_url.as_deref()) {
        Some(thumbnail_url) => {
            thumbnails::persist_remote_thumbnail(
                &state.http,
                &state.storage,
                thumbnail_url,
                output.platform,
            )
            .await
        }
        None => None,
    };

    let mode = if quota.is_premium {
        GenerationMode::Premium
    } else {
        GenerationMode::Free
    };
    let mut conn = db::conn(&state.pool)?;
    let hydrated = recipes::insert_full(
        &mut conn,
        recipes::NewRecipeData {
            user_id: user.id,
            source_url: Some(url),
            platform: output.platform,
            generation_mode: mode,
            image_url,
            recipe: &output.recipe,
        },
    )?;

    // Debit after successful persistence, exactly once per billable request.
    if !quota.is_premium {
        crate::admission::quota::debit(&mut conn, user.id);
    }

    tracing::info!(
        user_id = %user.id,
        recipe_id = %hydrated.recipe.id,
        platform = output.platform.as_str(),
        "analysis complete"
    );
    Ok(RecipeResponse::new(hydrated, user.id).into_response_with(Some(&rate)))
}

#[derive(OpenApi)]
#[openapi(paths(analyze), components(schemas(AnalyzeRequest)))]
pub struct ApiDoc;
