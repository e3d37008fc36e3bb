//! JWT session token service.

use chrono::{TimeDelta, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use blogicum_core::ports::{AuthError, TokenClaims, TokenService};

/// Secret used when none is configured. Only fit for development.
pub const DEFAULT_JWT_SECRET: &str = "blogicum-development-secret";

/// JWT token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_JWT_SECRET.to_string(),
            expiration_hours: 24,
            issuer: "blogicum".to_string(),
        }
    }
}

/// Audience every session token must carry.
const SESSION_AUDIENCE: &str = "blogicum-session";

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: Uuid,
    username: String,
    exp: i64,
    iat: i64,
    iss: String,
    aud: String,
}

/// HS256 session tokens carried by the session cookie.
pub struct JwtTokenService {
    keys: (EncodingKey, DecodingKey),
    validation: Validation,
    lifetime: TimeDelta,
    issuer: String,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let secret = config.secret.as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[SESSION_AUDIENCE]);
        validation.leeway = 0;

        Self {
            keys: (
                EncodingKey::from_secret(secret),
                DecodingKey::from_secret(secret),
            ),
            validation,
            lifetime: TimeDelta::hours(config.expiration_hours),
            issuer: config.issuer,
        }
    }
}

impl TokenService for JwtTokenService {
    fn generate_token(&self, user_id: Uuid, username: &str) -> Result<String, AuthError> {
        let issued_at = Utc::now();
        let claims = SessionClaims {
            sub: user_id,
            username: username.to_string(),
            exp: (issued_at + self.lifetime).timestamp(),
            iat: issued_at.timestamp(),
            iss: self.issuer.clone(),
            aud: SESSION_AUDIENCE.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.keys.0)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let claims = decode::<SessionClaims>(token, &self.keys.1, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(e.to_string()),
            })?
            .claims;

        Ok(TokenClaims {
            user_id: claims.sub,
            username: claims.username,
            exp: claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        self.lifetime.num_seconds()
    }
}
