use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::ServiceError;

/// HS256 token issuance and validation for logged-in users.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_days: i64,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiry_days", &self.expiry_days)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User id
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            expiry_days: config.expiry_days,
        }
    }

    pub fn issue(&self, user_id: &str, email: &str, name: &str) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.expiry_days)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to sign token: {}", e)))
    }

    pub fn validate(&self, token: &str) -> Result<AccessTokenClaims, ServiceError> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                _ => ServiceError::InvalidToken,
            })
    }

    pub fn expiry_days(&self) -> i64 {
        self.expiry_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str, expiry_days: i64) -> JwtService {
        JwtService::new(&JwtConfig {
            secret: secret.to_string(),
            expiry_days,
        })
    }

    #[test]
    fn test_issue_and_validate() {
        let jwt = service("test-secret", 60);
        let token = jwt.issue("user-1", "a@example.com", "Alex").unwrap();
        let claims = jwt.validate(&token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.exp - claims.iat, 60 * 24 * 60 * 60);
    }

    #[test]
    fn test_rejects_token_signed_with_other_secret() {
        let token = service("one", 60).issue("user-1", "a@example.com", "Alex").unwrap();
        let result = service("two", 60).validate(&token);
        assert!(matches!(result, Err(ServiceError::InvalidToken)));
    }

    #[test]
    fn test_rejects_expired_token() {
        let token = service("secret", -1).issue("user-1", "a@example.com", "Alex").unwrap();
        let result = service("secret", -1).validate(&token);
        assert!(matches!(result, Err(ServiceError::TokenExpired)));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(service("secret", 1).validate("not.a.jwt").is_err());
    }
}
