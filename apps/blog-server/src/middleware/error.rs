//! Error handling - one error type for handlers, HTML pages for error statuses.

use actix_web::body::MessageBody;
use actix_web::dev::{Payload, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{FromRequest, HttpResponse, ResponseError, web};
use tera::Context;

use blogicum_core::error::{DomainError, RepoError};
use blogicum_core::ports::{AuthError, MediaError};
use blogicum_shared::ErrorResponse;

use crate::middleware::auth::Identity;
use crate::state::AppState;

/// Application-level error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Conflict(detail) => ErrorResponse::new(409, "Conflict").with_detail(detail),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        // Replaced by an HTML page in `error_handlers` for browser-facing statuses.
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(error.detail.unwrap_or(error.title))
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            // Someone else's post or comment is indistinguishable from a missing one.
            DomainError::NotAuthorized { entity_type, id } => {
                tracing::debug!(entity_type, %id, "Non-author mutation attempt");
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound => AppError::NotFound("Resource not found".to_string()),
            RepoError::Constraint(msg) => AppError::Conflict(msg),
            RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

impl From<MediaError> for AppError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::InvalidKey(key) => AppError::NotFound(format!("media file {}", key)),
            MediaError::Io(msg) => AppError::Internal(format!("media storage: {}", msg)),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<tera::Error> for AppError {
    fn from(err: tera::Error) -> Self {
        // The top-level tera message hides the cause, e.g. a missing variable.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        AppError::Internal(format!("template rendering failed: {}", message))
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

/// Statuses answered with an HTML error page.
const PAGE_STATUSES: [StatusCode; 6] = [
    StatusCode::BAD_REQUEST,
    StatusCode::FORBIDDEN,
    StatusCode::NOT_FOUND,
    StatusCode::METHOD_NOT_ALLOWED,
    StatusCode::CONFLICT,
    StatusCode::INTERNAL_SERVER_ERROR,
];

/// Middleware that swaps error bodies for rendered error pages.
pub fn error_handlers<B: MessageBody + 'static>() -> ErrorHandlers<B> {
    PAGE_STATUSES
        .into_iter()
        .fold(ErrorHandlers::new(), |handlers, status| {
            handlers.handler(status, render_error_page)
        })
}

/// Template for a status: `pages/<code>.html` when there is one, else `pages/error.html`.
fn error_template(state: &AppState, status: StatusCode) -> String {
    let specific = format!("pages/{}.html", status.as_u16());
    if state.templates.get_template_names().any(|name| name == specific) {
        specific
    } else {
        "pages/error.html".to_string()
    }
}

fn render_error_page<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let (req, res) = res.into_parts();

    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Ok(ErrorHandlerResponse::Response(
            ServiceResponse::new(req, res).map_into_left_body(),
        ));
    };

    let viewer = Identity::from_request(&req, &mut Payload::None)
        .into_inner()
        .ok();
    let error = ErrorResponse::for_status(status.as_u16()).with_instance(req.path());

    let mut ctx = Context::new();
    ctx.insert("viewer", &viewer);
    ctx.insert("error", &error);

    let template = error_template(&state, status);
    let page = match state.templates.render(&template, &ctx) {
        Ok(html) => HttpResponse::build(status)
            .content_type(ContentType::html())
            .body(html),
        Err(e) => {
            tracing::error!(template = %template, error = %e, "Failed to render error page");
            HttpResponse::build(status)
                .content_type(ContentType::plaintext())
                .body(error.title)
        }
    };

    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, page).map_into_right_body(),
    ))
}
