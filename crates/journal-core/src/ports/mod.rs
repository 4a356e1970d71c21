//! Ports - trait definitions for the external collaborators.
//! These are the "interfaces" that backend adapters must implement.

mod identity;
mod posts;
mod profiles;

pub use identity::IdentityProvider;
pub use posts::{FeedSource, PostApi};
pub use profiles::ProfileApi;
