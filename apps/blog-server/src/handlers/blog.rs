//! Public listings: the index and category pages.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use blogicum_core::pagination::PageRequest;
use blogicum_core::visibility::PostFilter;
use blogicum_shared::dto::PageQuery;

use super::{page_context, render};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = PageRequest::parse(query.page.as_deref(), state.posts_per_page);
    let page = state
        .posts
        .list(&PostFilter::public(Utc::now()), request)
        .await?;

    let mut ctx = page_context(viewer.0.as_ref());
    ctx.insert("page_obj", &page);
    render(&state, "blog/index.html", &ctx)
}

/// GET /category/{slug}
///
/// Unknown and unpublished categories are both 404.
pub async fn category_posts(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let category = state
        .categories
        .find_by_slug(&slug)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| AppError::NotFound(format!("category {}", slug)))?;

    let request = PageRequest::parse(query.page.as_deref(), state.posts_per_page);
    let page = state
        .posts
        .list(&PostFilter::in_category(category.id, Utc::now()), request)
        .await?;

    let mut ctx = page_context(viewer.0.as_ref());
    ctx.insert("category", &category);
    ctx.insert("page_obj", &page);
    render(&state, "blog/category.html", &ctx)
}
