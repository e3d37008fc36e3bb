//! Form payloads - what the browser submits, before validation.
//!
//! Every field defaults to empty so that a form with missing inputs still
//! deserializes and can be re-rendered with field errors. Field-level rules
//! live on the structs as `validator` attributes; rules that need the
//! database (choices, uniqueness) are checked by the caller.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError};

pub const REQUIRED: &str = "This field is required.";

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.@+-]*$").expect("Failed to compile username regex"));

/// Non-blank after trimming.
fn required(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed(REQUIRED)));
    }
    Ok(())
}

/// Empty is allowed; anything else must be an address.
fn optional_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    Err(ValidationError::new("email").with_message(Cow::Borrowed("Enter a valid email address.")))
}

/// Post create/edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PostFormData {
    #[validate(
        custom(function = "required"),
        length(max = 256, message = "Ensure this value has at most 256 characters.")
    )]
    pub title: String,
    #[validate(custom(function = "required"))]
    pub text: String,
    /// `datetime-local` value; empty means "now".
    pub pub_date: String,
    /// Category id, empty for none.
    pub category: String,
    /// Location id, empty for none.
    pub location: String,
    /// `"true"`/`"false"`; absent means published.
    pub is_published: Option<String>,
}

impl PostFormData {
    /// Copy with surrounding whitespace stripped from title and text.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            text: self.text.trim().to_string(),
            ..self.clone()
        }
    }

    /// Assign a text field by its form name. Unknown names are ignored.
    ///
    /// Used when the form arrives as `multipart/form-data`.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = value,
            "text" => self.text = value,
            "pub_date" => self.pub_date = value,
            "category" => self.category = value,
            "location" => self.location = value,
            "is_published" => self.is_published = Some(value),
            _ => {}
        }
    }
}

/// Comment create/edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CommentFormData {
    #[validate(custom(function = "required"))]
    pub text: String,
}

/// Login form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoginForm {
    #[validate(custom(function = "required"))]
    pub username: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
    pub next: Option<String>,
}

/// Sign-up form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegistrationForm {
    #[validate(
        custom(function = "required"),
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,
    #[validate(custom(function = "optional_email"))]
    pub email: String,
    #[serde(skip_serializing)]
    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,
    #[serde(skip_serializing)]
    #[validate(length(min = 1, message = "This field is required."))]
    pub password2: String,
}

impl RegistrationForm {
    /// Copy with surrounding whitespace stripped from the text inputs.
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self.clone()
        }
    }
}

/// Profile edit form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProfileFormData {
    #[validate(
        custom(function = "required"),
        length(max = 150, message = "Ensure this value has at most 150 characters."),
        regex(
            path = *USERNAME_RE,
            message = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
        )
    )]
    pub username: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub first_name: String,
    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters."))]
    pub last_name: String,
    #[validate(custom(function = "optional_email"))]
    pub email: String,
}

impl ProfileFormData {
    /// Copy with surrounding whitespace stripped from every input.
    pub fn trimmed(&self) -> Self {
        Self {
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
        }
    }
}

/// `?page=N` on listing pages. Kept as a string so garbage falls back to page 1.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?next=/path` on the login page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NextQuery {
    pub next: Option<String>,
}
