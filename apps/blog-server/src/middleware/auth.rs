//! Session extractors.
//!
//! The session is a signed token carried in the `blogicum_session` cookie,
//! or in an `Authorization: Bearer` header for non-browser clients.

use std::future::{Ready, ready};

use actix_web::cookie::time::Duration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::{StatusCode, header};
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use serde::Serialize;
use uuid::Uuid;

use blogicum_core::ports::{AuthError, TokenClaims};

use crate::handlers::urls;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "blogicum_session";

/// Authenticated user identity extractor.
///
/// Handlers that take an `Identity` are login-required: anonymous requests
/// are redirected to the login page with `next` set to the current path.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            user_id: claims.user_id,
            username: claims.username,
        }
    }
}

/// Why a login-required request was turned away.
#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("{reason}")]
    LoginRequired { reason: AuthError, next: String },
    #[error("Application state is not configured")]
    Misconfigured,
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthenticationError::LoginRequired { .. } => StatusCode::FOUND,
            AuthenticationError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AuthenticationError::LoginRequired { reason, next } => {
                tracing::debug!(reason = %reason, next = %next, "Redirecting to login");
                HttpResponse::Found()
                    .insert_header((header::LOCATION, urls::login_with_next(next)))
                    .finish()
            }
            AuthenticationError::Misconfigured => {
                tracing::error!("AppState not found in app data");
                HttpResponse::InternalServerError().finish()
            }
        }
    }
}

/// The raw session token, from the cookie or the Authorization header.
fn session_token(req: &HttpRequest) -> Result<String, AuthError> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Ok(cookie.value().to_string());
    }

    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuth)?;
    let value = header
        .to_str()
        .map_err(|_| AuthError::InvalidToken("Invalid authorization header".to_string()))?;

    value
        .strip_prefix("Bearer ")
        .map(str::to_string)
        .ok_or_else(|| AuthError::InvalidToken("Expected Bearer token".to_string()))
}

impl FromRequest for Identity {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Err(AuthenticationError::Misconfigured));
        };

        let result = session_token(req)
            .and_then(|token| state.tokens.validate_token(&token))
            .map(Identity::from)
            .map_err(|reason| AuthenticationError::LoginRequired {
                reason,
                next: req.path().to_string(),
            });

        ready(result)
    }
}

/// Optional identity extractor - doesn't fail if not authenticated.
pub struct OptionalIdentity(pub Option<Identity>);

impl OptionalIdentity {
    pub fn user_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|identity| identity.user_id)
    }
}

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        match Identity::from_request(req, payload).into_inner() {
            Ok(identity) => ready(Ok(OptionalIdentity(Some(identity)))),
            Err(_) => ready(Ok(OptionalIdentity(None))),
        }
    }
}

/// The cookie that carries a freshly issued session token.
pub fn session_cookie(token: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(max_age_seconds))
        .finish()
}

/// A cookie that makes the browser drop the session.
pub fn expired_session_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .finish();
    cookie.make_removal();
    cookie
}
