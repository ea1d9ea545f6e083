pub mod admin;
pub mod analyze;
pub mod client_ip;
pub mod generate;
pub mod health;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cocotte_core::error::PipelineError;
use cocotte_core::types::Language;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::limits::rate_gate::RateHeaders;
use crate::models::{Ingredient, Recipe, Step};

/// Typed API error owning the HTTP status and wire-code mapping.
///
/// The wire shape is `{success: false, error: <CODE>, message, ...}` with
/// contextual fields per variant; 429s carry a `Retry-After` header.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Auth { code: &'static str, message: String },

    #[error("{message}")]
    Validation { code: &'static str, message: String },

    /// LLM verdict: the content is not culinary. Message is user-visible
    /// and localized.
    #[error("{message}")]
    NotRecipe { message: String },

    #[error("{message}")]
    PremiumRequired { message: String },

    #[error("admin key missing or invalid")]
    Forbidden,

    #[error("an analysis is already in progress for this account")]
    AnalysisInProgress { locked_url: String },

    #[error("{message}")]
    RateLimited {
        code: &'static str,
        message: String,
        retry_after_secs: i64,
    },

    #[error("{message}")]
    CostLimited {
        code: &'static str,
        message: String,
        scope: &'static str,
        remaining: i64,
    },

    #[error("server overloaded, retry shortly")]
    Overloaded { retry_after_secs: i64 },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Validation { .. } | ApiError::NotRecipe { .. } => StatusCode::BAD_REQUEST,
            ApiError::PremiumRequired { .. } | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::AnalysisInProgress { .. }
            | ApiError::RateLimited { .. }
            | ApiError::CostLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Overloaded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth { code, .. }
            | ApiError::Validation { code, .. }
            | ApiError::RateLimited { code, .. }
            | ApiError::CostLimited { code, .. } => code,
            ApiError::NotRecipe { .. } => "NOT_RECIPE",
            ApiError::PremiumRequired { .. } => "PREMIUM_REQUIRED",
            ApiError::Forbidden => "FORBIDDEN",
            ApiError::AnalysisInProgress { .. } => "ANALYSIS_IN_PROGRESS",
            ApiError::Overloaded { .. } => "SERVER_OVERLOADED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn auth_missing() -> Self {
        ApiError::Auth {
            code: "AUTH_MISSING",
            message: "Missing bearer token".to_string(),
        }
    }

    pub fn auth_invalid() -> Self {
        ApiError::Auth {
            code: "AUTH_INVALID",
            message: "Invalid bearer token".to_string(),
        }
    }

    pub fn auth_expired() -> Self {
        ApiError::Auth {
            code: "AUTH_EXPIRED",
            message: "Bearer token has expired".to_string(),
        }
    }

    pub fn url_missing(language: Language) -> Self {
        ApiError::Validation {
            code: "URL_MISSING",
            message: match language {
                Language::Fr => "Le champ url est requis.".to_string(),
                Language::En => "The url field is required.".to_string(),
            },
        }
    }

    pub fn invalid_language() -> Self {
        ApiError::Validation {
            code: "INVALID_LANGUAGE",
            message: "language must be one of: fr, en".to_string(),
        }
    }

    pub fn premium_required(language: Language) -> Self {
        ApiError::PremiumRequired {
            message: match language {
                Language::Fr => {
                    "Vos générations gratuites sont épuisées. Passez en premium pour continuer."
                        .to_string()
                }
                Language::En => {
                    "Your free generations are used up. Upgrade to premium to continue."
                        .to_string()
                }
            },
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::NotRecipe { message } => ApiError::NotRecipe { message },
            PipelineError::UnsupportedPlatform(url) => ApiError::Validation {
                code: "PLATFORM_UNSUPPORTED",
                message: format!("No supported platform matches this URL: {}", url),
            },
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        ApiError::Internal(format!("database error: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(code = code, error = %message, "request failed");
        } else {
            tracing::warn!(code = code, error = %message, "request denied");
        }

        let mut body = json!({
            "success": false,
            "error": code,
            "message": message,
        });

        let retry_after = match &self {
            ApiError::NotRecipe { message } => {
                body["userMessage"] = json!(message);
                None
            }
            ApiError::AnalysisInProgress { locked_url } => {
                body["lockedUrl"] = json!(locked_url);
                None
            }
            ApiError::CostLimited {
                scope, remaining, ..
            } => {
                body["scope"] = json!(scope);
                body["remaining"] = json!(remaining);
                None
            }
            ApiError::RateLimited {
                retry_after_secs, ..
            }
            | ApiError::Overloaded { retry_after_secs } => {
                body["retryAfter"] = json!(retry_after_secs);
                Some(*retry_after_secs)
            }
            _ => None,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

/// A recipe with its children, as returned to callers.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecipeWithChildren {
    #[serde(flatten)]
    pub recipe: Recipe,
    /// Ordered by name.
    pub ingredients: Vec<Ingredient>,
    /// Ordered by step order.
    pub steps: Vec<Step>,
}

/// Success envelope for /analyze and /generate.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecipeResponse {
    pub success: bool,
    pub recipe: RecipeWithChildren,
    pub user_id: Uuid,
    #[serde(rename = "alreadyExists", skip_serializing_if = "Option::is_none")]
    pub already_exists: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<bool>,
}

impl RecipeResponse {
    pub fn new(recipe: RecipeWithChildren, user_id: Uuid) -> Self {
        Self {
            success: true,
            recipe,
            user_id,
            already_exists: None,
            duplicated: None,
            generated: None,
        }
    }

    pub fn already_exists(mut self) -> Self {
        self.already_exists = Some(true);
        self
    }

    pub fn duplicated(mut self) -> Self {
        self.duplicated = Some(true);
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = Some(true);
        self
    }

    /// 200 response, with user-scope rate-limit headers when available.
    pub fn into_response_with(self, rate: Option<&RateHeaders>) -> Response {
        let mut response = (StatusCode::OK, Json(self)).into_response();
        if let Some(rate) = rate {
            rate.apply(response.headers_mut());
        }
        response
    }
}

/// Generate the complete OpenAPI spec by merging all module specs
pub fn openapi() -> utoipa::openapi::OpenApi {
    use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

    #[derive(OpenApi)]
    #[openapi(components(schemas(RecipeResponse, RecipeWithChildren)))]
    struct BaseApi;

    let mut spec = BaseApi::openapi();

    if let Some(components) = spec.components.as_mut() {
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }

    let modules: Vec<utoipa::openapi::OpenApi> = vec![
        health::ApiDoc::openapi(),
        analyze::ApiDoc::openapi(),
        generate::ApiDoc::openapi(),
        admin::ApiDoc::openapi(),
    ];

    for module_spec in modules {
        spec.paths.paths.extend(module_spec.paths.paths);
        if let Some(module_components) = module_spec.components {
            if let Some(spec_components) = spec.components.as_mut() {
                spec_components.schemas.extend(module_components.schemas);
            }
        }
    }

    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::auth_missing().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::url_missing(Language::En).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::premium_required(Language::En).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::AnalysisInProgress {
                locked_url: "u".to_string()
            }
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::Overloaded {
                retry_after_secs: 30
            }
            .status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::Internal("x".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(ApiError::auth_expired().code(), "AUTH_EXPIRED");
        assert_eq!(ApiError::invalid_language().code(), "INVALID_LANGUAGE");
        assert_eq!(
            ApiError::NotRecipe {
                message: "m".to_string()
            }
            .code(),
            "NOT_RECIPE"
        );
        assert_eq!(ApiError::Forbidden.code(), "FORBIDDEN");
        assert_eq!(
            ApiError::Overloaded {
                retry_after_secs: 1
            }
            .code(),
            "SERVER_OVERLOADED"
        );
    }

    #[test]
    fn test_pipeline_error_translation() {
        let err: ApiError = PipelineError::NotRecipe {
            message: "Ce lien ne parle pas de cuisine.".to_string(),
        }
        .into();
        assert_eq!(err.code(), "NOT_RECIPE");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err: ApiError = PipelineError::UnsupportedPlatform("https://x".to_string()).into();
        assert_eq!(err.code(), "PLATFORM_UNSUPPORTED");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
