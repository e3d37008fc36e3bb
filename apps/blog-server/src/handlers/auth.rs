//! Login, logout and sign-up.

use actix_web::{HttpResponse, web};

use blogicum_core::domain::User;
use blogicum_core::error::RepoError;
use blogicum_core::forms::{FormErrors, NON_FIELD_ERRORS, validate_login, validate_registration};
use blogicum_shared::dto::{LoginForm, NextQuery, RegistrationForm};

use super::{page_context, redirect, render, urls};
use crate::middleware::auth::{OptionalIdentity, expired_session_cookie, session_cookie};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// GET /auth/login
pub async fn login_form(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    query: web::Query<NextQuery>,
) -> AppResult<HttpResponse> {
    let form = LoginForm {
        next: query.into_inner().next,
        ..LoginForm::default()
    };
    render_login(&state, &viewer, &form, &FormErrors::new())
}

/// POST /auth/login
pub async fn login(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let (username, password) = match validate_login(&form) {
        Ok(credentials) => credentials,
        Err(errors) => return render_login(&state, &viewer, &form, &errors),
    };

    let user = match state.users.find_by_username(&username).await? {
        Some(user) if state.passwords.verify(&password, &user.password_hash)? => user,
        _ => {
            tracing::info!(username = %username, "Failed login attempt");
            let errors = FormErrors::single(NON_FIELD_ERRORS, INVALID_LOGIN);
            return render_login(&state, &viewer, &form, &errors);
        }
    };

    let token = state.tokens.generate_token(user.id, &user.username)?;
    let target = form
        .next
        .as_deref()
        .filter(|next| urls::is_safe_next(next))
        .map(str::to_string)
        .unwrap_or_else(urls::index);

    tracing::info!(user_id = %user.id, "User logged in");
    let mut response = redirect(&target);
    response
        .add_cookie(&session_cookie(token, state.tokens.expiration_seconds()))
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

/// POST /auth/logout
pub async fn logout() -> AppResult<HttpResponse> {
    let mut response = redirect(&urls::index());
    response
        .add_cookie(&expired_session_cookie())
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(response)
}

/// GET /auth/registration
pub async fn registration_form(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
) -> AppResult<HttpResponse> {
    render_registration(
        &state,
        &viewer,
        &RegistrationForm::default(),
        &FormErrors::new(),
    )
}

/// POST /auth/registration
///
/// Creates the account without logging in, then goes to the index.
pub async fn registration(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    form: web::Form<RegistrationForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let registration = match validate_registration(&form) {
        Ok(registration) => registration,
        Err(errors) => return render_registration(&state, &viewer, &form, &errors),
    };

    if state
        .users
        .find_by_username(&registration.username)
        .await?
        .is_some()
    {
        let errors = FormErrors::single("username", USERNAME_TAKEN);
        return render_registration(&state, &viewer, &form, &errors);
    }

    let password_hash = state.passwords.hash(&registration.password)?;
    let user = User::new(registration.username, registration.email, password_hash);
    let user = match state.users.insert(user).await {
        Ok(user) => user,
        Err(RepoError::Constraint(_)) => {
            let errors = FormErrors::single("username", USERNAME_TAKEN);
            return render_registration(&state, &viewer, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(redirect(&urls::index()))
}

fn render_login(
    state: &AppState,
    viewer: &OptionalIdentity,
    form: &LoginForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(viewer.0.as_ref());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("non_field_errors", errors.get(NON_FIELD_ERRORS));
    render(state, "registration/login.html", &ctx)
}

fn render_registration(
    state: &AppState,
    viewer: &OptionalIdentity,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let mut ctx = page_context(viewer.0.as_ref());
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    render(state, "registration/registration_form.html", &ctx)
}
