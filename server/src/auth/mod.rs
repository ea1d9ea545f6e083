//! Bearer-token verification against the identity provider's symmetric
//! secret. The algorithm is pinned to HS256 and the issuer to the
//! provider's auth endpoint.

mod extractor;

pub use extractor::AuthUser;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::ApiError;

/// Claims carried by the identity provider's access tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: stable user id.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    pub iss: String,
}

/// The authenticated caller, attached to the request scope.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Verify a bearer token and extract the caller's identity.
pub fn verify_token(token: &str, secret: &str, issuer: &str) -> Result<AuthedUser, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::auth_expired(),
        _ => ApiError::auth_invalid(),
    })?;

    let id = Uuid::parse_str(&data.claims.sub).map_err(|_| ApiError::auth_invalid())?;

    Ok(AuthedUser {
        id,
        email: data.claims.email,
        role: data.claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-jwt-secret";
    const ISSUER: &str = "https://project.supabase.co/auth/v1";

    fn make_token(sub: &str, iss: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("cook@example.com".to_string()),
            role: Some("authenticated".to_string()),
            exp: (Utc::now() + Duration::seconds(exp_offset_secs)).timestamp(),
            iss: iss.to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = make_token(&user_id.to_string(), ISSUER, 3600);
        let user = verify_token(&token, SECRET, ISSUER).unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email.as_deref(), Some("cook@example.com"));
    }

    #[test]
    fn test_expired_token() {
        let token = make_token(&Uuid::new_v4().to_string(), ISSUER, -3600);
        let err = verify_token(&token, SECRET, ISSUER).unwrap_err();
        assert_eq!(err.code(), "AUTH_EXPIRED");
    }

    #[test]
    fn test_wrong_issuer() {
        let token = make_token(&Uuid::new_v4().to_string(), "https://evil.example/auth/v1", 3600);
        let err = verify_token(&token, SECRET, ISSUER).unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID");
    }

    #[test]
    fn test_wrong_secret() {
        let token = make_token(&Uuid::new_v4().to_string(), ISSUER, 3600);
        let err = verify_token(&token, "other-secret", ISSUER).unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID");
    }

    #[test]
    fn test_non_uuid_subject() {
        let token = make_token("service-account", ISSUER, 3600);
        let err = verify_token(&token, SECRET, ISSUER).unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID");
    }

    #[test]
    fn test_garbage_token() {
        let err = verify_token("not.a.token", SECRET, ISSUER).unwrap_err();
        assert_eq!(err.code(), "AUTH_INVALID");
    }
}
