//! Post detail and the create/edit/delete flow.

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, HttpResponse, web};
use chrono::Utc;
use futures_util::StreamExt;
use tera::Context;
use uuid::Uuid;

use blogicum_core::domain::{Post, PostListing};
use blogicum_core::forms::{
    FormErrors, ImageUpload, MAX_IMAGE_BYTES, NON_FIELD_ERRORS, PostDraft, validate_image,
    validate_post,
};
use blogicum_core::ownership::ensure_author;
use blogicum_shared::dto::{CommentFormData, PostFormData};

use super::{page_context, redirect, render, urls};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const FORM_TEMPLATE: &str = "blog/create.html";
const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";

/// GET /posts/{post_id}
pub async fn detail(
    state: web::Data<AppState>,
    viewer: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let ctx = detail_context(
        &state,
        viewer.0.as_ref(),
        post_id,
        &CommentFormData::default(),
        &FormErrors::new(),
    )
    .await?;
    render(&state, "blog/detail.html", &ctx)
}

/// Everything the detail page shows. Shared with the comment form, which
/// re-renders this page on invalid input.
pub(crate) async fn detail_context(
    state: &AppState,
    viewer: Option<&Identity>,
    post_id: Uuid,
    comment_form: &CommentFormData,
    comment_errors: &FormErrors,
) -> AppResult<Context> {
    let listing = visible_listing(state, viewer, post_id).await?;
    let comments = state.comments.list_for_post(post_id).await?;

    let mut ctx = page_context(viewer);
    ctx.insert(
        "is_author",
        &viewer.is_some_and(|v| v.user_id == listing.post.author_id),
    );
    ctx.insert("post", &listing);
    ctx.insert("comments", &comments);
    ctx.insert("form", comment_form);
    ctx.insert("errors", comment_errors);
    Ok(ctx)
}

/// The post as `viewer` may see it: always for its author, otherwise only
/// while publicly visible.
pub(crate) async fn visible_listing(
    state: &AppState,
    viewer: Option<&Identity>,
    post_id: Uuid,
) -> AppResult<PostListing> {
    state
        .posts
        .find_listing(post_id)
        .await?
        .filter(|listing| {
            viewer.is_some_and(|v| v.user_id == listing.post.author_id)
                || listing.is_visible_at(Utc::now())
        })
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

/// GET /posts/create
pub async fn create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    render_post_form(
        &state,
        &identity,
        None,
        &PostFormData::default(),
        &FormErrors::new(),
    )
    .await
}

/// POST /posts/create
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let (form, image) = read_post_form(&req, payload).await?;

    let draft = match validate_submission(&state, &form, image.as_ref()).await? {
        Ok(draft) => draft,
        Err(errors) => return render_post_form(&state, &identity, None, &form, &errors).await,
    };

    let mut post = draft.into_post(identity.user_id);
    if let Some(upload) = image {
        post.image = Some(store_image(&state, upload).await?);
    }
    let new_image = post.image.clone();
    let post = match state.posts.insert(post).await {
        Ok(post) => post,
        Err(e) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");
    author_profile_redirect(&state, &identity).await
}

/// GET /posts/{post_id}/edit
///
/// Someone else's post sends the visitor to its detail page.
pub async fn edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    if ensure_author(&post, identity.user_id).is_err() {
        return Ok(redirect(&urls::post_detail(post.id)));
    }

    let form = PostFormData {
        title: post.title.clone(),
        text: post.text.clone(),
        pub_date: post.pub_date.format(DATETIME_LOCAL).to_string(),
        category: post.category_id.map(|id| id.to_string()).unwrap_or_default(),
        location: post.location_id.map(|id| id.to_string()).unwrap_or_default(),
        is_published: Some(post.is_published.to_string()),
    };
    render_post_form(&state, &identity, Some(&post), &form, &FormErrors::new()).await
}

/// POST /posts/{post_id}/edit
///
/// A new image replaces the stored one. No upload keeps it.
pub async fn edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    req: HttpRequest,
    payload: web::Payload,
) -> AppResult<HttpResponse> {
    let mut post = load_post(&state, path.into_inner()).await?;
    if ensure_author(&post, identity.user_id).is_err() {
        return Ok(redirect(&urls::post_detail(post.id)));
    }

    let (form, image) = read_post_form(&req, payload).await?;
    let draft = match validate_submission(&state, &form, image.as_ref()).await? {
        Ok(draft) => draft,
        Err(errors) => {
            return render_post_form(&state, &identity, Some(&post), &form, &errors).await;
        }
    };

    let new_image = match image {
        Some(upload) => Some(store_image(&state, upload).await?),
        None => None,
    };
    let replaced = new_image.clone().and_then(|key| post.image.replace(key));
    draft.apply_to(&mut post);
    let post = match state.posts.update(post).await {
        Ok(post) => post,
        Err(e) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(e.into());
        }
    };

    if let Some(old_key) = replaced {
        remove_image(&state, &old_key).await;
    }

    tracing::info!(post_id = %post.id, "Post updated");
    Ok(redirect(&urls::post_detail(post.id)))
}

/// GET /posts/{post_id}/delete - confirmation page.
pub async fn delete_confirm(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post_id = path.into_inner();
    let listing = state
        .posts
        .find_listing(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;
    ensure_author(&listing.post, identity.user_id)?;

    let mut ctx = page_context(Some(&identity));
    ctx.insert("post", &listing);
    render(&state, "blog/delete_post.html", &ctx)
}

/// POST /posts/{post_id}/delete
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    ensure_author(&post, identity.user_id)?;

    state.posts.delete(post.id).await?;
    if let Some(key) = &post.image {
        remove_image(&state, key).await;
    }

    tracing::info!(post_id = %post.id, "Post deleted");
    author_profile_redirect(&state, &identity).await
}

/// Redirect to the author's profile under their current username. The
/// session token may still carry a name the user has since changed.
async fn author_profile_redirect(state: &AppState, identity: &Identity) -> AppResult<HttpResponse> {
    let author = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", identity.user_id)))?;
    Ok(redirect(&urls::profile(&author.username)))
}

async fn load_post(state: &AppState, post_id: Uuid) -> AppResult<Post> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

/// Validate the form fields and the optional image together so that all
/// errors show at once.
async fn validate_submission(
    state: &AppState,
    form: &PostFormData,
    image: Option<&ImageUpload>,
) -> AppResult<Result<PostDraft, FormErrors>> {
    let categories = state.categories.list_all().await?;
    let locations = state.locations.list_all().await?;

    let draft = validate_post(form, &categories, &locations, Utc::now());
    let image_check = image.map(validate_image).unwrap_or(Ok(()));

    Ok(match (draft, image_check) {
        (Ok(draft), Ok(())) => Ok(draft),
        (Ok(_), Err(errors)) => Err(errors),
        (Err(errors), Ok(())) => Err(errors),
        (Err(mut errors), Err(image_errors)) => {
            for message in image_errors.get("image") {
                errors.add("image", message.clone());
            }
            Err(errors)
        }
    })
}

async fn render_post_form(
    state: &AppState,
    identity: &Identity,
    post: Option<&Post>,
    form: &PostFormData,
    errors: &FormErrors,
) -> AppResult<HttpResponse> {
    let categories = state.categories.list_all().await?;
    let locations = state.locations.list_all().await?;

    let mut ctx = page_context(Some(identity));
    ctx.insert("post", &post);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("non_field_errors", errors.get(NON_FIELD_ERRORS));
    ctx.insert("categories", &categories);
    ctx.insert("locations", &locations);
    render(state, FORM_TEMPLATE, &ctx)
}

async fn store_image(state: &AppState, upload: ImageUpload) -> AppResult<String> {
    let extension = upload.extension().unwrap_or_default();
    Ok(state.media.store(&extension, upload.bytes).await?)
}

/// Best effort: a leftover file is logged, not surfaced.
async fn remove_image(state: &AppState, key: &str) {
    if let Err(e) = state.media.remove(key).await {
        tracing::warn!(key = %key, error = %e, "Failed to remove post image");
    }
}

/// Drop an image stored for a write that did not go through.
async fn discard_image(state: &AppState, key: Option<&str>) {
    if let Some(key) = key {
        remove_image(state, key).await;
    }
}

/// Read a post form sent either url-encoded or as `multipart/form-data`.
async fn read_post_form(
    req: &HttpRequest,
    payload: web::Payload,
) -> AppResult<(PostFormData, Option<ImageUpload>)> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        read_multipart(Multipart::new(req.headers(), payload)).await
    } else {
        let form = web::Form::<PostFormData>::from_request(req, &mut payload.into_inner())
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        Ok((form.into_inner(), None))
    }
}

async fn read_multipart(
    mut payload: Multipart,
) -> AppResult<(PostFormData, Option<ImageUpload>)> {
    let mut form = PostFormData::default();
    let mut image = None;

    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| AppError::BadRequest(format!("Error reading multipart field: {}", e)))?;

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);
        let content_type = field.content_type().map(|ct| ct.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| AppError::BadRequest(format!("Error reading file chunk: {}", e)))?;
            data.extend_from_slice(&chunk);
            // Oversized images still get a form error; only stop reading far past the limit.
            if data.len() > 2 * MAX_IMAGE_BYTES {
                return Err(AppError::BadRequest(format!("field {} is too large", name)));
            }
        }

        match (name.as_str(), file_name) {
            ("image", Some(file_name)) => {
                // An empty file input still sends a part with no name and no bytes.
                if !file_name.is_empty() && !data.is_empty() {
                    image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: data,
                    });
                }
            }
            (_, _) => {
                let value = String::from_utf8(data)
                    .map_err(|_| AppError::BadRequest(format!("field {} is not UTF-8", name)))?;
                form.set_field(&name, value);
            }
        }
    }

    Ok((form, image))
}
