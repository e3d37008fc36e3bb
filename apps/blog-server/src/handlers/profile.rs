//! Profile pages.

use actix_web::{HttpResponse, web};
use chrono::Utc;

use blogicum_core::domain::User;
use blogicum_core::error::RepoError;
use blogicum_core::forms::{FormErrors, validate_profile};
use blogicum_core::pagination::PageRequest;
use blogicum_core::visibility::PostFilter;
use blogicum_shared::dto::{PageQuery, ProfileFormData};

use super::{page_context, redirect, render, urls};
use crate::middleware::auth::{Identity, OptionalIdentity, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// GET /profile/{username}
///
/// The owner also sees their unpublished and scheduled posts.
pub async fn profile(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let user = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", username)))?;

    let filter = PostFilter::for_profile(user.id, viewer.user_id(), Utc::now());
    let request = PageRequest::parse(query.page.as_deref(), state.posts_per_page);
    let page = state.posts.list(&filter, request).await?;

    let mut ctx = page_context(viewer.0.as_ref());
    ctx.insert("is_owner", &(viewer.user_id() == Some(user.id)));
    ctx.insert("profile", &user);
    ctx.insert("display_name", &user.display_name());
    ctx.insert("page_obj", &page);
    render(&state, "blog/profile.html", &ctx)
}

/// GET /edit_profile
pub async fn edit_profile_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let user = load_user(&state, &identity).await?;
    let form = ProfileFormData {
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        email: user.email,
    };
    render_profile_form(&state, &identity, &form, &FormErrors::new())
}

/// POST /edit_profile
///
/// The session token carries the username, so it is reissued on success.
pub async fn edit_profile(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<ProfileFormData>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let mut user = load_user(&state, &identity).await?;

    let update = match validate_profile(&form) {
        Ok(update) => update,
        Err(errors) => return render_profile_form(&state, &identity, &form, &errors),
    };

    let taken = state
        .users
        .find_by_username(&update.username)
        .await?
        .is_some_and(|other| other.id != user.id);
    if taken {
        let errors = FormErrors::single("username", USERNAME_TAKEN);
        return render_profile_form(&state, &identity, &form, &errors);
    }

    update.apply_to(&mut user);
    let user = match state.users.update(user).await {
        Ok(user) => user,
        // Lost a race with another sign-up for the same name.
        Err(RepoError::Constraint(_)) => {
            let errors = FormErrors::single("username", USERNAME_TAKEN);
            return render_profile_form(&state, &identity, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.tokens.generate_token(user.id, &user.username)?;
    tracing::info!(user_id = %user.id, "Profile updated");

    let mut response = redirect(&urls::profile(&user.username));
    response
        .add_cookie(&session_cookie(token, state.tokens.expiration_seconds()))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

async fn load_user(state: &AppState, identity: &Identity) -> AppResult<User> {
    state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", identity.user_id)))
}

fn render_profile_form(
    state: &AppState,
    identity: &Identity,
    form: &ProfileFormData,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(Some(identity));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    render(state, "blog/user.html", &ctx)
}
