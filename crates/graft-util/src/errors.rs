use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for graft operations outside the graph builder.
#[derive(Debug, Error, Diagnostic)]
pub enum GraftError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed recipe file.
    #[error("Recipe error: {message}")]
    #[diagnostic(help("Check the recipe TOML for syntax errors"))]
    Recipe { message: String },

    /// A package reference could not be parsed.
    #[error("Invalid reference '{reference}': {message}")]
    #[diagnostic(help("References look like name/version@user/channel#revision"))]
    Reference { reference: String, message: String },

    /// Global configuration or profile could not be loaded.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Lock file could not be read, parsed or written.
    #[error("Lockfile error: {message}")]
    Lockfile { message: String },

    /// A recipe could not be found in any index or remote.
    #[error("Unable to find '{reference}' in the recipe index")]
    NotFound { reference: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type GraftResult<T> = miette::Result<T>;
