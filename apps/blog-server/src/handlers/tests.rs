use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::{StatusCode, header};
use actix_web::{test, web};
use chrono::{Duration, Utc};

use blogicum_core::domain::{Category, Comment, Location, Post, User};
use blogicum_core::pagination::PageRequest;
use blogicum_core::visibility::PostFilter;

use crate::config::{AppConfig, DEFAULT_TEMPLATES_DIR};
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::{AppState, load_templates};

const PASSWORD: &str = "correct-horse";
const BOUNDARY: &str = "blogicum-form-boundary";
const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nnot really pixels";

fn test_state() -> web::Data<AppState> {
    state_with_config(&AppConfig::default())
}

fn state_with_config(config: &AppConfig) -> web::Data<AppState> {
    let templates = load_templates(DEFAULT_TEMPLATES_DIR).expect("templates compile");
    web::Data::new(AppState::in_memory(config, Arc::new(templates)))
}

/// State whose uploads land in a fresh temporary directory.
fn state_with_media() -> (web::Data<AppState>, PathBuf) {
    let media_root = std::env::temp_dir().join(format!("blogicum-http-{}", uuid::Uuid::new_v4()));
    let config = AppConfig {
        media_root: media_root.to_string_lossy().into_owned(),
        ..AppConfig::default()
    };
    (state_with_config(&config), media_root)
}

fn stored_images(media_root: &Path) -> usize {
    std::fs::read_dir(media_root.join("posts_images"))
        .map(|entries| entries.count())
        .unwrap_or(0)
}

/// A file part of a multipart body: `(file_name, content_type, bytes)`.
type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

/// Encode text fields and an optional `image` file as `multipart/form-data`.
fn multipart_body(fields: &[(&str, &str)], image: Option<FilePart<'_>>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(
    uri: &str,
    cookie: Cookie<'static>,
    fields: &[(&str, &str)],
    image: Option<FilePart<'_>>,
) -> test::TestRequest {
    test::TestRequest::post()
        .uri(uri)
        .cookie(cookie)
        .insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(multipart_body(fields, image))
}

async fn seed_user(state: &AppState, username: &str) -> User {
    let hash = state.passwords.hash(PASSWORD).unwrap();
    state
        .users
        .insert(User::new(
            username.to_string(),
            format!("{}@example.com", username),
            hash,
        ))
        .await
        .unwrap()
}

async fn seed_post(state: &AppState, author: &User, title: &str) -> Post {
    seed_post_with(state, author, title, |_| {}).await
}

async fn seed_post_with(
    state: &AppState,
    author: &User,
    title: &str,
    tweak: impl FnOnce(&mut Post),
) -> Post {
    let mut post = Post::new(
        author.id,
        title.to_string(),
        format!("{} body", title),
        Utc::now() - Duration::hours(1),
    );
    tweak(&mut post);
    state.posts.insert(post).await.unwrap()
}

fn session(state: &AppState, user: &User) -> Cookie<'static> {
    let token = state
        .tokens
        .generate_token(user.id, &user.username)
        .unwrap();
    Cookie::new(SESSION_COOKIE, token)
}

fn location(resp: &actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn body_text(
    resp: actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_rt::test]
async fn test_index_shows_only_visible_posts() {
    let state = test_state();
    let author = seed_user(&state, "author").await;

    let hidden = state
        .categories
        .insert({
            let mut category = Category::new(
                "Hidden".to_string(),
                "hidden".to_string(),
                String::new(),
            );
            category.is_published = false;
            category
        })
        .await
        .unwrap();

    seed_post(&state, &author, "Visible trip").await;
    seed_post_with(&state, &author, "Draft trip", |p| p.is_published = false).await;
    seed_post_with(&state, &author, "Scheduled trip", |p| {
        p.pub_date = Utc::now() + Duration::days(1)
    })
    .await;
    seed_post_with(&state, &author, "Secret trip", |p| {
        p.category_id = Some(hidden.id)
    })
    .await;

    let app = test::init_service(crate::build_app(state.clone())).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Visible trip"));
    assert!(!body.contains("Draft trip"));
    assert!(!body.contains("Scheduled trip"));
    assert!(!body.contains("Secret trip"));
}

#[actix_rt::test]
async fn test_unpublished_category_page_is_not_found() {
    let state = test_state();
    let mut category = Category::new("Hidden".to_string(), "hidden".to_string(), String::new());
    category.is_published = false;
    state.categories.insert(category).await.unwrap();

    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/category/hidden").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/category/missing").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_unknown_paths_render_not_found_page() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/posts/not-a-uuid").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/no/such/page").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_text(resp).await;
    assert!(body.contains("404: page not found"));
}

#[actix_rt::test]
async fn test_login_required_redirects_with_next() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/posts/create/").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login?next=/posts/create");
}

#[actix_rt::test]
async fn test_create_post_then_comment() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/posts/create")
            .cookie(session(&state, &author))
            .set_form([
                ("title", "First trip"),
                ("text", "We went to the sea."),
                ("pub_date", ""),
                ("category", ""),
                ("location", ""),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author");

    let page = state
        .posts
        .list(
            &PostFilter::for_profile(author.id, Some(author.id), Utc::now()),
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    let post_id = page.items[0].post.id;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment", post_id))
            .cookie(session(&state, &author))
            .set_form([("text", "Lovely")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}", post_id));
    assert_eq!(state.comments.count_for_post(post_id).await.unwrap(), 1);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}", post_id))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("We went to the sea."));
    assert!(body.contains("Lovely"));
}

#[actix_rt::test]
async fn test_invalid_post_form_rerenders_with_errors() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/posts/create")
            .cookie(session(&state, &author))
            .set_form([("title", ""), ("text", "Body only")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains("Body only"));
}

#[actix_rt::test]
async fn test_empty_comment_rerenders_detail() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let post = seed_post(&state, &author, "Trip").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment", post.id))
            .cookie(session(&state, &author))
            .set_form([("text", "   ")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(state.comments.count_for_post(post.id).await.unwrap(), 0);
}

#[actix_rt::test]
async fn test_unpublished_post_is_visible_to_its_author_only() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let reader = seed_user(&state, "reader").await;
    let post = seed_post_with(&state, &author, "Draft", |p| p.is_published = false).await;
    let app = test::init_service(crate::build_app(state.clone())).await;
    let uri = format!("/posts/{}", post.id);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&uri)
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_non_author_cannot_edit_or_delete_post() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let reader = seed_user(&state, "reader").await;
    let post = seed_post(&state, &author, "Trip").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit", post.id))
            .cookie(session(&state, &reader))
            .set_form([("title", "Hijacked"), ("text", "x")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}", post.id));

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/delete", post.id))
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let stored = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Trip");
}

#[actix_rt::test]
async fn test_author_deletes_post() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let post = seed_post(&state, &author, "Trip").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/delete", post.id))
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author");
    assert!(state.posts.find_by_id(post.id).await.unwrap().is_none());
}

#[actix_rt::test]
async fn test_someone_elses_comment_is_not_found() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let reader = seed_user(&state, "reader").await;
    let post = seed_post(&state, &author, "Trip").await;
    let comment = state
        .comments
        .insert(Comment::new(post.id, author.id, "Mine".to_string()))
        .await
        .unwrap();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit_comment/{}", post.id, comment.id))
            .cookie(session(&state, &reader))
            .set_form([("text", "Changed")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/delete_comment/{}", post.id, comment.id))
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let stored = state.comments.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.text, "Mine");
}

#[actix_rt::test]
async fn test_login_sets_session_cookie_and_follows_next() {
    let state = test_state();
    seed_user(&state, "author").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_form([
                ("username", "author"),
                ("password", PASSWORD),
                ("next", "/posts/create"),
            ])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/posts/create");
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .expect("session cookie set");
    assert!(cookie.http_only().unwrap_or(false));
}

#[actix_rt::test]
async fn test_login_with_wrong_password_shows_error() {
    let state = test_state();
    seed_user(&state, "author").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login")
            .set_form([("username", "author"), ("password", "wrong-password")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.response().cookies().next().is_none());
    let body = body_text(resp).await;
    assert!(body.contains("Please enter a correct username and password."));
}

#[actix_rt::test]
async fn test_registration_creates_user_once() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;
    let form = [
        ("username", "newbie"),
        ("email", "newbie@example.com"),
        ("password1", "long-enough-pw"),
        ("password2", "long-enough-pw"),
    ];

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/registration")
            .set_form(form)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(state.users.find_by_username("newbie").await.unwrap().is_some());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/registration")
            .set_form(form)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("A user with that username already exists."));
}

#[actix_rt::test]
async fn test_profile_of_unknown_user_is_not_found() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/profile/nobody").to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_metrics_count_requests() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;

    test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/prometheus-metrics")
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("# TYPE http_requests_total counter"));
    assert!(body.contains("http_requests_total 2"));
    assert!(body.contains("application_working 1"));
}

#[actix_rt::test]
async fn test_health_reports_in_memory_store() {
    let state = test_state();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["database"], "in-memory");
}

#[actix_rt::test]
async fn test_multipart_create_stores_every_field_and_serves_image() {
    let (state, media_root) = state_with_media();
    let author = seed_user(&state, "author").await;
    let category = state
        .categories
        .insert(Category::new(
            "Travel".to_string(),
            "travel".to_string(),
            String::new(),
        ))
        .await
        .unwrap();
    let place = state
        .locations
        .insert(Location::new("Lisbon".to_string()))
        .await
        .unwrap();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let category_id = category.id.to_string();
    let location_id = place.id.to_string();
    let resp = test::call_service(
        &app,
        multipart_request(
            "/posts/create",
            session(&state, &author),
            &[
                ("title", "Harbour walk"),
                ("text", "Boats everywhere."),
                ("pub_date", "2024-05-01T12:30"),
                ("category", &category_id),
                ("location", &location_id),
                ("is_published", "false"),
            ],
            Some(("harbour.png", "image/png", PNG_BYTES)),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/author");

    let page = state
        .posts
        .list(
            &PostFilter::for_profile(author.id, Some(author.id), Utc::now()),
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    let listing = &page.items[0];
    assert_eq!(listing.post.title, "Harbour walk");
    assert_eq!(listing.post.text, "Boats everywhere.");
    assert_eq!(
        listing.post.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
        "2024-05-01T12:30"
    );
    assert_eq!(listing.post.category_id, Some(category.id));
    assert_eq!(listing.post.location_id, Some(place.id));
    assert!(!listing.post.is_published);

    let key = listing.post.image.clone().expect("image stored");
    assert!(key.starts_with("posts_images/"));
    assert!(key.ends_with(".png"));
    assert_eq!(std::fs::read(media_root.join(&key)).unwrap(), PNG_BYTES);

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/media/{}", key))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert!(
        resp.headers()
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("max-age=86400"))
    );
    assert_eq!(test::read_body(resp).await.as_ref(), PNG_BYTES);

    let _ = std::fs::remove_dir_all(&media_root);
}

#[actix_rt::test]
async fn test_media_for_unknown_or_escaping_key_is_not_found() {
    let (state, media_root) = state_with_media();
    let app = test::init_service(crate::build_app(state.clone())).await;

    for uri in ["/media/posts_images/missing.png", "/media/../Cargo.toml"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    let _ = std::fs::remove_dir_all(&media_root);
}

#[actix_rt::test]
async fn test_multipart_edit_keeps_or_replaces_image() {
    let (state, media_root) = state_with_media();
    let author = seed_user(&state, "author").await;
    let old_key = state.media.store("png", PNG_BYTES.to_vec()).await.unwrap();
    let post = seed_post_with(&state, &author, "Trip", |p| p.image = Some(old_key.clone())).await;
    let app = test::init_service(crate::build_app(state.clone())).await;
    let uri = format!("/posts/{}/edit", post.id);

    // An empty file input keeps the stored image.
    let resp = test::call_service(
        &app,
        multipart_request(
            &uri,
            session(&state, &author),
            &[
                ("title", "Trip, revised"),
                ("text", "New body"),
                ("pub_date", "2024-06-02T08:15"),
                ("is_published", "true"),
            ],
            Some(("", "application/octet-stream", b"")),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}", post.id));

    let stored = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Trip, revised");
    assert_eq!(stored.text, "New body");
    assert_eq!(
        stored.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
        "2024-06-02T08:15"
    );
    assert!(stored.is_published);
    assert_eq!(stored.image.as_deref(), Some(old_key.as_str()));
    assert!(media_root.join(&old_key).exists());

    let resp = test::call_service(
        &app,
        multipart_request(
            &uri,
            session(&state, &author),
            &[("title", "Trip, revised"), ("text", "New body")],
            Some(("sunset.gif", "image/gif", b"GIF89a")),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let stored = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    let new_key = stored.image.expect("image replaced");
    assert_ne!(new_key, old_key);
    assert!(new_key.ends_with(".gif"));
    assert!(media_root.join(&new_key).exists());
    assert!(!media_root.join(&old_key).exists());

    let _ = std::fs::remove_dir_all(&media_root);
}

#[actix_rt::test]
async fn test_non_image_upload_rerenders_form() {
    let (state, media_root) = state_with_media();
    let author = seed_user(&state, "author").await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        multipart_request(
            "/posts/create",
            session(&state, &author),
            &[("title", "Notes"), ("text", "Plain text attached")],
            Some(("notes.txt", "text/plain", b"hello")),
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Upload a valid image."));
    assert!(body.contains("Plain text attached"));
    assert_eq!(stored_images(&media_root), 0);

    let page = state
        .posts
        .list(
            &PostFilter::for_profile(author.id, Some(author.id), Utc::now()),
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());

    let _ = std::fs::remove_dir_all(&media_root);
}

#[actix_rt::test]
async fn test_failed_insert_discards_uploaded_image() {
    let (state, media_root) = state_with_media();
    let author = seed_user(&state, "author").await;
    let cookie = session(&state, &author);
    // The token outlives the account, so the insert hits a missing author.
    state.users.delete(author.id).await.unwrap();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        multipart_request(
            "/posts/create",
            cookie,
            &[("title", "Orphan"), ("text", "No author left")],
            Some(("orphan.png", "image/png", PNG_BYTES)),
        )
        .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(stored_images(&media_root), 0);

    let _ = std::fs::remove_dir_all(&media_root);
}

#[actix_rt::test]
async fn test_post_redirects_use_current_username() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let cookie = session(&state, &author);

    let mut renamed = author.clone();
    renamed.username = "renamed".to_string();
    state.users.update(renamed).await.unwrap();
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/posts/create")
            .cookie(cookie.clone())
            .set_form([("title", "After rename"), ("text", "Body")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/renamed");

    let page = state
        .posts
        .list(
            &PostFilter::for_profile(author.id, Some(author.id), Utc::now()),
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    let post_id = page.items[0].post.id;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/delete", post_id))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/renamed");
}

#[actix_rt::test]
async fn test_profile_shows_hidden_posts_to_owner_only() {
    let state = test_state();
    let author = seed_user(&state, "author").await;
    let reader = seed_user(&state, "reader").await;
    seed_post(&state, &author, "Visible trip").await;
    seed_post_with(&state, &author, "Draft trip", |p| p.is_published = false).await;
    seed_post_with(&state, &author, "Scheduled trip", |p| {
        p.pub_date = Utc::now() + Duration::days(1)
    })
    .await;
    let app = test::init_service(crate::build_app(state.clone())).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author")
            .cookie(session(&state, &author))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Visible trip"));
    assert!(body.contains("Draft trip"));
    assert!(body.contains("Scheduled trip"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author")
            .cookie(session(&state, &reader))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("Visible trip"));
    assert!(!body.contains("Draft trip"));
    assert!(!body.contains("Scheduled trip"));
}
