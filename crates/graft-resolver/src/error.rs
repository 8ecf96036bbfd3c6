use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort a graph build. The first one raised ends the build.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// A requirement names the requesting package or one of its ancestors.
    #[error("Loop detected: '{consumer}' requires '{requirement}' which is an ancestor too")]
    LoopDetected {
        consumer: String,
        requirement: String,
    },

    #[error(
        "Conflict in {consumer}\n    Requirement {requested} conflicts with already defined {previous}\n    To change it, override it in your base requirements"
    )]
    #[diagnostic(help("Declare the version you want in the root recipe so it overrides both paths"))]
    ReferenceConflict {
        consumer: String,
        requested: String,
        previous: String,
    },

    #[error("Conflict in {consumer}\n    Different revisions of {requested} have been requested (already defined {previous})")]
    RevisionConflict {
        consumer: String,
        requested: String,
        previous: String,
    },

    #[error(
        "{consumer}: Incompatible requirements obtained in different evaluations of 'requirements'\n    Previous requirements: {previous}\n    New requirements: {current}"
    )]
    #[diagnostic(help("The requirements hook must return the same set every time it runs"))]
    RequirementsNondeterminism {
        consumer: String,
        previous: String,
        current: String,
    },

    /// The recipe of a requirement could not be fetched or loaded.
    #[error("{consumer}: Failed requirement '{requirement}': {message}")]
    RecipeResolution {
        consumer: String,
        requirement: String,
        message: String,
    },

    /// A user-authored hook returned an error.
    #[error("{manifest}: Error in {hook}() method: {message}")]
    UserHook {
        manifest: String,
        hook: String,
        message: String,
    },

    /// Option propagation or validation failed.
    #[error("{reference}: {message}")]
    Configuration { reference: String, message: String },

    #[error("Alias cycle detected resolving {reference}: {chain}")]
    AliasCycle { reference: String, chain: String },

    #[error("{consumer}: Version range '{requirement}' could not be resolved: {message}")]
    RangeUnresolved {
        consumer: String,
        requirement: String,
        message: String,
    },

    #[error("{consumer}: {message}")]
    Lock { consumer: String, message: String },
}

pub type ResolveResult<T> = Result<T, ResolveError>;
