//! Static pages.

use actix_web::{HttpResponse, web};

use super::{page_context, render};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /pages/about
pub async fn about(state: web::Data<AppState>, viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    render(&state, "pages/about.html", &page_context(viewer.0.as_ref()))
}

/// GET /pages/rules
pub async fn rules(state: web::Data<AppState>, viewer: OptionalIdentity) -> AppResult<HttpResponse> {
    render(&state, "pages/rules.html", &page_context(viewer.0.as_ref()))
}
