//! Ownership guard for edit/delete operations.

use uuid::Uuid;

use crate::domain::{Comment, Post};
use crate::error::DomainError;

/// An entity that belongs to the user who wrote it.
pub trait Authored {
    /// Name used in errors and logs.
    const ENTITY_TYPE: &'static str;

    fn id(&self) -> Uuid;

    fn author_id(&self) -> Uuid;
}

impl Authored for Post {
    const ENTITY_TYPE: &'static str = "Post";

    fn id(&self) -> Uuid {
        self.id
    }

    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Comment {
    const ENTITY_TYPE: &'static str = "Comment";

    fn id(&self) -> Uuid {
        self.id
    }

    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// Fail with [`DomainError::NotAuthorized`] unless `user_id` wrote `entity`.
pub fn ensure_author<T: Authored>(entity: &T, user_id: Uuid) -> Result<(), DomainError> {
    if entity.author_id() == user_id {
        Ok(())
    } else {
        Err(DomainError::NotAuthorized {
            entity_type: T::ENTITY_TYPE,
            id: entity.id(),
        })
    }
}
