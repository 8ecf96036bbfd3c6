//! Shared utilities for graft.
//!
//! Cross-cutting concerns used by the other graft crates: the generic error
//! type and a couple of filesystem helpers.

pub mod errors;
pub mod fs;
