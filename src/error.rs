//! Typed error types for scriptgate.

/// All errors produced by the scriptgate library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The submission was rejected before analysis (empty, oversized).
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Config(String),

    /// A sandbox backend could not be constructed or driven.
    #[error("{0}")]
    Sandbox(String),
}

/// A `Result` alias where the error type is [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
