//! Recipe index for graft.
//!
//! Implements the recipe-side collaborators of the graph builder over a set
//! of recipe files: [`index::RecipeIndex`] finds recipes, loads them into
//! manifests and lists available versions; [`hooks::DeclarativeHooks`] runs
//! the `[[conditional]]` and `[[configure]]` rules of a recipe.

pub mod hooks;
pub mod index;
pub mod loader;
