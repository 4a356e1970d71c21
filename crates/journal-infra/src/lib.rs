//! # Journal Infrastructure
//!
//! Backend adapters implementing the ports defined in `journal-core`.
//!
//! ## Feature Flags
//!
//! - `http` (default) - REST client for the journal API via reqwest
//! - `minimal` - No network dependencies, in-memory backend only

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use memory::{InMemoryBackend, InMemoryConfig, Operation};

#[cfg(feature = "http")]
pub use http::{HttpBackend, HttpConfig};
