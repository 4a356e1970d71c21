//! # Journal Shared
//!
//! Wire types shared with the journal backend.

pub mod dto;
