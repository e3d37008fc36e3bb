//! Publication-visibility filter shared by every post listing.
//!
//! A post is listed publicly iff it is published, its category (if any) is
//! published, and its `pub_date` has passed. Repositories evaluate the same
//! [`PostFilter`] either in memory ([`PostFilter::matches`]) or as SQL.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Post, PostListing};

/// Which posts a listing is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    /// Every post (index page).
    All,
    /// Posts of one category.
    Category(Uuid),
    /// Posts written by one user.
    Author(Uuid),
}

/// Whether hidden posts are included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only posts visible at `now`.
    Public { now: DateTime<Utc> },
    /// Unpublished and scheduled posts too. Only an author viewing their own profile gets this.
    IncludeHidden,
}

/// A listing query: scope plus visibility. Results are always newest-first by `pub_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostFilter {
    pub scope: PostScope,
    pub visibility: Visibility,
}

impl PostFilter {
    /// The index page.
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            scope: PostScope::All,
            visibility: Visibility::Public { now },
        }
    }

    /// A category page.
    pub fn in_category(category_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            scope: PostScope::Category(category_id),
            visibility: Visibility::Public { now },
        }
    }

    /// A profile page. The profile owner also sees their hidden posts.
    pub fn for_profile(author_id: Uuid, viewer_id: Option<Uuid>, now: DateTime<Utc>) -> Self {
        let visibility = if viewer_id == Some(author_id) {
            Visibility::IncludeHidden
        } else {
            Visibility::Public { now }
        };
        Self {
            scope: PostScope::Author(author_id),
            visibility,
        }
    }

    /// Evaluate the filter against one post and its category row.
    pub fn matches(&self, post: &Post, category: Option<&Category>) -> bool {
        let in_scope = match self.scope {
            PostScope::All => true,
            PostScope::Category(id) => post.category_id == Some(id),
            PostScope::Author(id) => post.author_id == id,
        };
        in_scope
            && match self.visibility {
                Visibility::Public { now } => post.is_visible_at(category, now),
                Visibility::IncludeHidden => true,
            }
    }
}

/// Order listings newest-first by publication date.
pub fn sort_newest_first(listings: &mut [PostListing]) {
    listings.sort_by(|a, b| {
        b.post
            .pub_date
            .cmp(&a.post.pub_date)
            .then_with(|| b.post.created_at.cmp(&a.post.created_at))
    });
}
