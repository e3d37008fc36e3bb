//! HTTP handlers and route configuration.

mod auth;
mod blog;
mod comments;
mod health;
mod media;
mod metrics;
mod pages;
mod posts;
mod profile;
pub mod urls;

#[cfg(test)]
mod tests;

use actix_web::http::header::{self, ContentType};
use actix_web::{HttpResponse, web};
use tera::Context;

use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Blog
        .route("/", web::get().to(blog::index))
        .route("/category/{slug}", web::get().to(blog::category_posts))
        .route("/profile/{username}", web::get().to(profile::profile))
        .service(
            web::resource("/edit_profile")
                .route(web::get().to(profile::edit_profile_form))
                .route(web::post().to(profile::edit_profile)),
        )
        // Posts. `create` before `{post_id}` so it is not parsed as an id.
        .service(
            web::resource("/posts/create")
                .route(web::get().to(posts::create_form))
                .route(web::post().to(posts::create)),
        )
        .route("/posts/{post_id}", web::get().to(posts::detail))
        .service(
            web::resource("/posts/{post_id}/edit")
                .route(web::get().to(posts::edit_form))
                .route(web::post().to(posts::edit)),
        )
        .service(
            web::resource("/posts/{post_id}/delete")
                .route(web::get().to(posts::delete_confirm))
                .route(web::post().to(posts::delete)),
        )
        // Comments
        .route(
            "/posts/{post_id}/comment",
            web::post().to(comments::add_comment),
        )
        .service(
            web::resource("/posts/{post_id}/edit_comment/{comment_id}")
                .route(web::get().to(comments::edit_comment_form))
                .route(web::post().to(comments::edit_comment)),
        )
        .service(
            web::resource("/posts/{post_id}/delete_comment/{comment_id}")
                .route(web::get().to(comments::delete_comment_confirm))
                .route(web::post().to(comments::delete_comment)),
        )
        // Auth
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/login")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .route("/logout", web::post().to(auth::logout))
                .service(
                    web::resource("/registration")
                        .route(web::get().to(auth::registration_form))
                        .route(web::post().to(auth::registration)),
                ),
        )
        // Static pages and files
        .route("/pages/about", web::get().to(pages::about))
        .route("/pages/rules", web::get().to(pages::rules))
        .route("/media/{path:.*}", web::get().to(media::serve))
        // Operations
        .route("/health", web::get().to(health::health_check))
        .route(
            "/prometheus-metrics",
            web::get().to(metrics::prometheus_metrics),
        )
        .default_service(web::to(not_found));
}

async fn not_found() -> AppResult<HttpResponse> {
    Err(AppError::NotFound("No such page".to_string()))
}

/// Context every page starts from.
pub(crate) fn page_context(viewer: Option<&Identity>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("viewer", &viewer);
    ctx
}

/// Render a template as a 200 HTML page.
pub(crate) fn render(state: &AppState, template: &str, ctx: &Context) -> AppResult<HttpResponse> {
    let html = state.templates.render(template, ctx)?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

/// 302 to `location`.
pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}
