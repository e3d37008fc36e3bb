//! Comments under a post. Someone else's comment is a 404.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use blogicum_core::domain::Comment;
use blogicum_core::forms::{FormErrors, validate_comment};
use blogicum_core::ownership::ensure_author;
use blogicum_shared::dto::CommentFormData;

use super::posts::{detail_context, visible_listing};
use super::{page_context, redirect, render, urls};
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const COMMENT_TEMPLATE: &str = "blog/comment.html";

/// POST /posts/{post_id}/comment
///
/// Only posts the commenter can see accept comments. Invalid input
/// re-renders the detail page with the errors.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    form: web::Form<CommentFormData>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let form = form.into_inner();

    let text = match validate_comment(&form) {
        Ok(text) => text,
        Err(errors) => {
            let ctx = detail_context(&state, Some(&identity), post_id, &form, &errors).await?;
            return render(&state, "blog/detail.html", &ctx);
        }
    };

    visible_listing(&state, Some(&identity), post_id).await?;

    let comment = state
        .comments
        .insert(Comment::new(post_id, identity.user_id, text))
        .await?;

    tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment added");
    Ok(redirect(&urls::post_detail(post_id)))
}

/// GET /posts/{post_id}/edit_comment/{comment_id}
pub async fn edit_comment_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_own_comment(&state, &identity, post_id, comment_id).await?;

    let form = CommentFormData {
        text: comment.text.clone(),
    };
    render_comment_page(&state, &identity, &comment, Some(&form), &FormErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}
pub async fn edit_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    form: web::Form<CommentFormData>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let mut comment = load_own_comment(&state, &identity, post_id, comment_id).await?;

    let form = form.into_inner();
    match validate_comment(&form) {
        Ok(text) => {
            comment.text = text;
            state.comments.update(comment).await?;
            tracing::info!(comment_id = %comment_id, "Comment updated");
            Ok(redirect(&urls::post_detail(post_id)))
        }
        Err(errors) => render_comment_page(&state, &identity, &comment, Some(&form), &errors),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id} - confirmation page.
pub async fn delete_comment_confirm(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let comment = load_own_comment(&state, &identity, post_id, comment_id).await?;

    render_comment_page(&state, &identity, &comment, None, &FormErrors::new())
}

/// POST /posts/{post_id}/delete_comment/{comment_id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    load_own_comment(&state, &identity, post_id, comment_id).await?;

    state.comments.delete(comment_id).await?;

    tracing::info!(comment_id = %comment_id, "Comment deleted");
    Ok(redirect(&urls::post_detail(post_id)))
}

/// The comment, if it exists under `post_id` and `identity` wrote it.
async fn load_own_comment(
    state: &AppState,
    identity: &Identity,
    post_id: Uuid,
    comment_id: Uuid,
) -> AppResult<Comment> {
    let comment = state
        .comments
        .find_by_id(comment_id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| AppError::NotFound(format!("comment {}", comment_id)))?;
    ensure_author(&comment, identity.user_id)?;
    Ok(comment)
}

/// The edit form when `form` is given, the delete confirmation otherwise.
fn render_comment_page(
    state: &AppState,
    identity: &Identity,
    comment: &Comment,
    form: Option<&CommentFormData>,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(Some(identity));
    ctx.insert("comment", comment);
    ctx.insert("form", &form);
    ctx.insert("errors", errors);
    render(state, COMMENT_TEMPLATE, &ctx)
}
