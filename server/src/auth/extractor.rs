use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use super::{verify_token, AuthedUser};
use crate::api::ApiError;
use crate::state::SharedState;

/// Extractor that validates the Authorization header and provides the
/// authenticated user.
///
/// Use this in any handler that requires authentication:
/// ```ignore
/// async fn my_handler(AuthUser(user): AuthUser) -> impl IntoResponse {
///     // user is the authenticated caller
/// }
/// ```
pub struct AuthUser(pub AuthedUser);

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(ApiError::auth_missing)?;

        let auth_str = auth_header.to_str().map_err(|_| ApiError::auth_invalid())?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(ApiError::auth_invalid)?;

        let user = verify_token(
            token,
            &state.config.supabase_jwt_secret,
            &state.jwt_issuer,
        )?;

        Ok(AuthUser(user))
    }
}
