//! Core data types for graft.
//!
//! This crate defines the vocabulary shared by the resolver and its
//! collaborators: package references, requirements and their downstream
//! override rules, package options, the loaded manifest handle with its
//! user hooks, the recipe file format, profiles, global configuration, the
//! lock file, and the traits the graph builder consumes.
//!
//! This crate is intentionally free of graph logic and network I/O.

pub mod config;
pub mod lockfile;
pub mod manifest;
pub mod options;
pub mod profile;
pub mod provider;
pub mod recipe;
pub mod reference;
pub mod requirement;
