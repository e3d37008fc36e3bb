use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, Location, User};

/// Longest accepted post title, in characters.
pub const TITLE_MAX_LENGTH: usize = 256;

/// Post entity - a blog article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub category_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    /// Media storage key of the attached image.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, published post.
    pub fn new(author_id: Uuid, title: String, text: String, pub_date: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            title,
            text,
            pub_date,
            is_published: true,
            category_id: None,
            location_id: None,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the post may appear in public listings at `now`.
    ///
    /// `category` is the post's category row, if it has one. A dangling
    /// `category_id` with no row counts as "no category".
    pub fn is_visible_at(&self, category: Option<&Category>, now: DateTime<Utc>) -> bool {
        self.is_published
            && self.pub_date <= now
            && category.is_none_or(|c| c.is_published)
    }
}

/// A post joined with everything a listing shows about it.
#[derive(Debug, Clone, Serialize)]
pub struct PostListing {
    pub post: Post,
    pub author: User,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comment_count: u64,
}

impl PostListing {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.post.is_visible_at(self.category.as_ref(), now)
    }
}
