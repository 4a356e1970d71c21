//! Domain entities - the objects the client caches and edits.

mod category;
mod draft;
mod identity;
mod post;
mod profile;

pub use category::{Category, UnknownCategory};
pub use draft::{DraftPost, ImageSource, LocalFile};
pub use identity::ExternalIdentity;
pub use post::{
    AuthorSummary, Cursor, FeedPage, FeedQuery, NewPost, PostDetail, PostSummary,
};
pub use profile::{NewProfile, Profile};
