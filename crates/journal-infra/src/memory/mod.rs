//! In-memory backend - every port served from process memory.
//!
//! Used by the integration tests and for offline runs of the client.
//! Data is lost on process restart.

mod backend;

pub use backend::{InMemoryBackend, InMemoryConfig, Operation};
