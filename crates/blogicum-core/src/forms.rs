//! Field-level form validation.
//!
//! Validators turn raw form payloads into typed drafts or a map of field
//! errors. They never fail any other way: handlers re-render the form with
//! the errors and answer 200.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use blogicum_shared::dto::{
    CommentFormData, LoginForm, PostFormData, ProfileFormData, RegistrationForm,
};

use crate::domain::{Category, Location, Post, User};

/// Key for errors not tied to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Largest accepted image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Field name -> messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build errors holding one message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl From<ValidationErrors> for FormErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut form_errors = Self::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string);
                form_errors.add(&field, message);
            }
        }
        form_errors
    }
}

/// A validated post form.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
}

impl PostDraft {
    pub fn into_post(self, author_id: Uuid) -> Post {
        let mut post = Post::new(author_id, self.title, self.text, self.pub_date);
        post.is_published = self.is_published;
        post.category_id = self.category_id;
        post.location_id = self.location_id;
        post
    }

    /// Overwrite the editable fields of an existing post.
    pub fn apply_to(self, post: &mut Post) {
        post.title = self.title;
        post.text = self.text;
        post.pub_date = self.pub_date;
        post.is_published = self.is_published;
        post.category_id = self.category_id;
        post.location_id = self.location_id;
        post.updated_at = Utc::now();
    }
}

/// Validate a post form. `categories` and `locations` are the valid choices.
pub fn validate_post(
    data: &PostFormData,
    categories: &[Category],
    locations: &[Location],
    now: DateTime<Utc>,
) -> Result<PostDraft, FormErrors> {
    let data = data.trimmed();
    let mut errors = field_errors(&data);

    let pub_date = match data.pub_date.trim() {
        "" => Some(now),
        raw => parse_datetime(raw),
    };
    if pub_date.is_none() {
        errors.add("pub_date", "Enter a valid date/time.");
    }

    let category_id = parse_choice(&data.category, categories.iter().map(|c| c.id));
    if category_id.is_err() {
        errors.add("category", INVALID_CHOICE);
    }

    let location_id = parse_choice(&data.location, locations.iter().map(|l| l.id));
    if location_id.is_err() {
        errors.add("location", INVALID_CHOICE);
    }

    let (Some(pub_date), Ok(category_id), Ok(location_id)) = (pub_date, category_id, location_id)
    else {
        return Err(errors);
    };

    let is_published = parse_checkbox(data.is_published.as_deref());
    errors.into_result(PostDraft {
        title: data.title,
        text: data.text,
        pub_date,
        is_published,
        category_id,
        location_id,
    })
}

/// An uploaded file, before it is stored.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Lower-cased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }
}

/// Check an optional post image. Errors are reported under the `image` field.
pub fn validate_image(upload: &ImageUpload) -> Result<(), FormErrors> {
    let mut errors = FormErrors::new();

    let is_image_type = upload
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"));
    let allowed_ext = upload
        .extension()
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()));

    if !is_image_type || !allowed_ext {
        errors.add(
            "image",
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image.",
        );
    }
    if upload.bytes.len() > MAX_IMAGE_BYTES {
        errors.add("image", "The image is larger than 5 MB.");
    }

    errors.into_result(())
}

/// Validate a comment form, returning the trimmed text.
pub fn validate_comment(data: &CommentFormData) -> Result<String, FormErrors> {
    field_errors(data).into_result(data.text.trim().to_string())
}

/// Validate the login form, returning `(username, password)`.
pub fn validate_login(data: &LoginForm) -> Result<(String, String), FormErrors> {
    field_errors(data).into_result((data.username.trim().to_string(), data.password.clone()))
}

/// A validated sign-up form. Username uniqueness is checked by the caller.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn validate_registration(data: &RegistrationForm) -> Result<Registration, FormErrors> {
    let data = data.trimmed();
    let mut errors = field_errors(&data);

    if !data.password2.is_empty() && data.password1 != data.password2 {
        errors.add("password2", "The two password fields didn't match.");
    }

    errors.into_result(Registration {
        username: data.username,
        email: data.email,
        password: data.password1,
    })
}

/// A validated profile edit. Username uniqueness is checked by the caller.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileUpdate {
    pub fn apply_to(self, user: &mut User) {
        user.username = self.username;
        user.first_name = self.first_name;
        user.last_name = self.last_name;
        user.email = self.email;
        user.updated_at = Utc::now();
    }
}

pub fn validate_profile(data: &ProfileFormData) -> Result<ProfileUpdate, FormErrors> {
    let data = data.trimmed();
    field_errors(&data).into_result(ProfileUpdate {
        username: data.username,
        first_name: data.first_name,
        last_name: data.last_name,
        email: data.email,
    })
}

/// Run the field rules declared on a form payload.
fn field_errors(data: &impl Validate) -> FormErrors {
    data.validate().map_err(FormErrors::from).err().unwrap_or_default()
}

/// Accepts RFC 3339 and the `datetime-local` family. Naive values are UTC.
fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Empty means "no choice"; anything else must be one of `choices`.
fn parse_choice(raw: &str, mut choices: impl Iterator<Item = Uuid>) -> Result<Option<Uuid>, ()> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let id = Uuid::parse_str(raw).map_err(|_| ())?;
    if choices.any(|c| c == id) {
        Ok(Some(id))
    } else {
        Err(())
    }
}

fn parse_checkbox(raw: Option<&str>) -> bool {
    match raw {
        None => true,
        Some(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "true" | "on" | "1" | "yes"
        ),
    }
}
