//! POST /generate: produce a recipe from user preferences.
//!
//! Same admission sequence as /analyze minus the idempotence lookups, on
//! the strict rate profile. The single-flight slot is held under a fixed
//! marker since there is no source URL.

use axum::extract::State;
use axum::response::Response;
use axum::Json;
use cocotte_core::prompts::generate_recipe::GenerationPreferences;
use cocotte_core::types::Language;
use cocotte_core::vocab;
use serde::Deserialize;
use serde_json::Value;
use utoipa::{OpenApi, ToSchema};

use crate::api::analyze::parse_language;
use crate::api::client_ip::ClientIp;
use crate::api::{ApiError, RecipeResponse};
use crate::auth::AuthUser;
use crate::db;
use crate::models::GenerationMode;
use crate::persistence::{recipes, thumbnails};
use crate::state::SharedState;

/// Lock key for generation requests (no source URL to key on).
const GENERATION_LOCK_KEY: &str = "generated";

/// Upper bound on listed ingredients; beyond this the request is noise.
const MAX_INGREDIENTS: usize = 30;

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateRequest {
    #[serde(default, rename = "mealType")]
    pub meal_type: Value,
    #[serde(default, rename = "dietTypes")]
    pub diet_types: Value,
    #[serde(default)]
    pub equipment: Value,
    #[serde(default)]
    pub ingredients: Value,
    #[serde(default)]
    pub language: Option<String>,
}

/// A JSON value that must be absent or an array of non-empty strings from
/// a closed set.
fn validate_string_array(
    value: &Value,
    allowed: Option<&[&str]>,
    code: &'static str,
    field: &str,
) -> Result<Vec<String>, ApiError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => {
            return Err(ApiError::Validation {
                code,
                message: format!("{field} must be an array of strings"),
            })
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(text) = item.as_str().map(str::trim).filter(|t| !t.is_empty()) else {
            return Err(ApiError::Validation {
                code,
                message: format!("{field} must contain non-empty strings"),
            });
        };
        if let Some(allowed) = allowed {
            if !vocab::contains(allowed, text) {
                return Err(ApiError::Validation {
                    code,
                    message: format!("unknown {field} value: {text}"),
                });
            }
        }
        out.push(text.to_string());
    }
    Ok(out)
}

fn validate_preferences(
    request: &GenerateRequest,
    language: Language,
) -> Result<GenerationPreferences, ApiError> {
    let meal_type = match &request.meal_type {
        Value::Null => None,
        Value::String(s) if vocab::contains(vocab::meal_types(language), s) => {
            Some(s.trim().to_string())
        }
        Value::String(s) => {
            return Err(ApiError::Validation {
                code: "INVALID_MEAL_TYPE",
                message: format!("unknown mealType value: {s}"),
            })
        }
        _ => {
            return Err(ApiError::Validation {
                code: "INVALID_MEAL_TYPE",
                message: "mealType must be a string".to_string(),
            })
        }
    };

    let diet_types = validate_string_array(
        &request.diet_types,
        Some(vocab::diet_types(language)),
        "INVALID_DIET_TYPES",
        "dietTypes",
    )?;
    let equipment = validate_string_array(
        &request.equipment,
        Some(vocab::equipment(language)),
        "INVALID_EQUIPMENT",
        "equipment",
    )?;
    let ingredients = validate_string_array(
        &request.ingredients,
        None,
        "INVALID_INGREDIENTS",
        "ingredients",
    )?;
    if ingredients.len() > MAX_INGREDIENTS {
        return Err(ApiError::Validation {
            code: "INVALID_INGREDIENTS",
            message: format!("ingredients is limited to {MAX_INGREDIENTS} entries"),
        });
    }

    Ok(GenerationPreferences {
        meal_type,
        diet_types,
        equipment,
        ingredients,
    })
}

#[utoipa::path(
    post,
    path = "/generate",
    tag = "recipes",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Recipe generated", body = crate::api::RecipeResponse),
        (status = 400, description = "Invalid preferences"),
        (status = 401, description = "Authentication failure"),
        (status = 403, description = "Free generations exhausted"),
        (status = 429, description = "Rate, cost or single-flight denial"),
        (status = 503, description = "Server overloaded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn generate(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<GenerateRequest>,
) -> Result<Response, ApiError> {
    let rate = state
        .rate_strict
        .check(&state.pool, &user.id.to_string(), &ip)?;

    state.cost_gate.admit(&state.pool, user.id)?;

    let language = parse_language(request.language.as_deref())?;
    let preferences = validate_preferences(&request, language)?;

    let _guard = state
        .single_flight
        .try_acquire(user.id, GENERATION_LOCK_KEY)
        .map_err(|locked_url| ApiError::AnalysisInProgress { locked_url })?;

    let mut conn = db::conn(&state.pool)?;
    let quota = crate::admission::quota::can_generate(&mut conn, user.id)?;
    if !quota.allowed {
        return Err(ApiError::premium_required(language));
    }
    drop(conn);

    let output = state.pipeline.generate(&preferences, language).await?;

    let image_url = match output.image {
        Some(image) => {
            thumbnails::persist_generated_image(&state.http, &state.storage, image).await
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
            source_url: None,
            platform: cocotte_core::types::Platform::Generated,
            generation_mode: mode,
            image_url,
            recipe: &output.recipe,
        },
    )?;

    if !quota.is_premium {
        crate::admission::quota::debit(&mut conn, user.id);
    }

    tracing::info!(
        user_id = %user.id,
        recipe_id = %hydrated.recipe.id,
        "generation complete"
    );
    Ok(RecipeResponse::new(hydrated, user.id)
        .generated()
        .into_response_with(Some(&rate)))
}

#[derive(OpenApi)]
#[openapi(paths(generate), components(schemas(GenerateRequest)))]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> GenerateRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_empty_request_is_valid() {
        let preferences =
            validate_preferences(&request(json!({})), Language::En).unwrap();
        assert!(preferences.meal_type.is_none());
        assert!(preferences.diet_types.is_empty());
    }

    #[test]
    fn test_known_values_pass() {
        let preferences = validate_preferences(
            &request(json!({
                "mealType": "dinner",
                "dietTypes": ["vegan"],
                "equipment": ["oven"],
                "ingredients": ["chickpeas", "spinach"]
            })),
            Language::En,
        )
        .unwrap();
        assert_eq!(preferences.meal_type.as_deref(), Some("dinner"));
        assert_eq!(preferences.ingredients.len(), 2);
    }

    #[test]
    fn test_unknown_meal_type_is_rejected() {
        let err = validate_preferences(&request(json!({"mealType": "brunch"})), Language::En)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_MEAL_TYPE");
    }

    #[test]
    fn test_wrong_type_diet_types_is_rejected() {
        let err = validate_preferences(&request(json!({"dietTypes": "vegan"})), Language::En)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_DIET_TYPES");
    }

    #[test]
    fn test_unknown_equipment_is_rejected() {
        let err = validate_preferences(
            &request(json!({"equipment": ["particle accelerator"]})),
            Language::En,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_EQUIPMENT");
    }

    #[test]
    fn test_empty_ingredient_strings_are_rejected() {
        let err = validate_preferences(
            &request(json!({"ingredients": ["rice", "  "]})),
            Language::En,
        )
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_INGREDIENTS");
    }

    #[test]
    fn test_french_vocabulary_applies_for_french_requests() {
        let preferences = validate_preferences(
            &request(json!({"mealType": "dîner", "dietTypes": ["végétalien"]})),
            Language::Fr,
        )
        .unwrap();
        assert_eq!(preferences.meal_type.as_deref(), Some("dîner"));
    }
}
