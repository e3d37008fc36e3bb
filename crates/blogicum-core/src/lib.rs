//! # Blogicum Core
//!
//! The domain layer of the blog: entities, the publication-visibility rule,
//! the ownership guard and form validation.
//! This crate contains pure business logic with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod ownership;
pub mod pagination;
pub mod ports;
pub mod visibility;

pub use error::{DomainError, RepoError};
pub use ownership::{Authored, ensure_author};
pub use pagination::{Page, PageRequest};
pub use visibility::{PostFilter, PostScope, Visibility};
