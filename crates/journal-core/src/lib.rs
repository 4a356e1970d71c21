//! # Journal Core
//!
//! Client-side session and content-state synchronization for the Thought
//! Journal. This crate holds the state machines and the ports they talk to;
//! it has no transport of its own.
//!
//! - [`session::SessionStore`] - current external identity
//! - [`profile::ProfileStore`] - identity to backend profile, onboarding
//! - [`reconciler::Reconciler`] - optimistic updates with single-flight
//! - [`likes::LikeReconciler`] and [`posts::PostActions`] - built on it
//! - [`feed::FeedPaginator`] - cursor pagination with de-duplication
//! - [`validation`] - draft checks for the composition form

pub mod context;
pub mod domain;
pub mod error;
pub mod feed;
pub mod likes;
pub mod ports;
pub mod posts;
pub mod profile;
pub mod reconciler;
pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{Backends, JournalContext};
pub use error::{ApiError, ClientError};
