//! Paths handlers redirect to.

use uuid::Uuid;

pub fn index() -> String {
    "/".to_string()
}

pub fn post_detail(post_id: Uuid) -> String {
    format!("/posts/{}", post_id)
}

pub fn profile(username: &str) -> String {
    format!("/profile/{}", username)
}

pub fn login_with_next(next: &str) -> String {
    format!("/auth/login?next={}", next)
}

/// Only local absolute paths are followed after login.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}
