//! Domain entities - the core business objects.

mod category;
mod comment;
mod location;
mod post;
mod user;

pub use category::Category;
pub use comment::{Comment, CommentView};
pub use location::Location;
pub use post::{Post, PostListing, TITLE_MAX_LENGTH};
pub use user::{USERNAME_MAX_LENGTH, User};
