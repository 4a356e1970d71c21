//! HTTP backend - the journal REST API over reqwest.

mod client;
mod convert;

pub use client::{HttpBackend, HttpConfig};
