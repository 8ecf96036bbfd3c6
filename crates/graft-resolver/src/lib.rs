//! Dependency graph builder: depth-first expansion of requirements into a
//! single consistent graph, with closure bookkeeping for conflict and loop
//! detection, diamond reconciliation, alias indirection, private and build
//! isolation, and build-requires injection.

pub mod alias;
pub mod build_requires;
pub mod builder;
pub mod closure;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod lock;
pub mod version;

pub use builder::{GraphBuilder, ResolveOptions};
pub use error::{ResolveError, ResolveResult};
pub use graph::{DepsGraph, Node};
