//! Bearer-token authentication.
//!
//! Token issuance is delegated to an external identity service; this
//! module only validates HS256 JWTs and exposes the claims as an
//! [`AuthUser`] extractor. The `admin` role gates the admin surface.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

pub const ROLE_ADMIN: &str = "admin";

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Authenticated user data extracted from a validated token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_ADMIN)
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "admin role required".to_string(),
            ))
        }
    }
}

/// Validates a bearer token and converts its claims into an [`AuthUser`].
pub fn decode_user(token: &str, secret: &str) -> Result<AuthUser, ServiceError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {e}")))?;

    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ServiceError::Unauthorized("invalid token subject".to_string()))?;

    Ok(AuthUser {
        id,
        email: data.claims.email,
        roles: data.claims.roles,
    })
}

/// Issues a short-lived HS256 token. Used by operational tooling and the
/// test harness; the production login flow lives elsewhere.
pub fn issue_token(
    user_id: Uuid,
    email: Option<String>,
    roles: Vec<String>,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, ServiceError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        email,
        roles,
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {e}")))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?
            .trim();

        decode_user(token, &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";

    #[test]
    fn round_trips_claims() {
        let id = Uuid::new_v4();
        let token = issue_token(
            id,
            Some("shopper@example.com".to_string()),
            vec!["customer".to_string()],
            SECRET,
            3600,
        )
        .unwrap();

        let user = decode_user(&token, SECRET).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email.as_deref(), Some("shopper@example.com"));
        assert!(!user.is_admin());
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = issue_token(Uuid::new_v4(), None, vec![], SECRET, 3600).unwrap();
        assert!(decode_user(&token, "another_secret_that_is_long_enough_123").is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let token = issue_token(Uuid::new_v4(), None, vec![], SECRET, -120).unwrap();
        assert!(decode_user(&token, SECRET).is_err());
    }

    #[test]
    fn admin_gate() {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            roles: vec![ROLE_ADMIN.to_string()],
        };
        assert!(user.require_admin().is_ok());

        let user = AuthUser {
            id: Uuid::new_v4(),
            email: None,
            roles: vec!["customer".to_string()],
        };
        assert!(matches!(
            user.require_admin(),
            Err(ServiceError::Forbidden(_))
        ));
    }
}
