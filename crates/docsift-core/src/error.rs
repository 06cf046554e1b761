use std::path::PathBuf;

/// Errors that can occur across docsift.
///
/// Library crates use this type directly; the binary crate converts to
/// `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use docsift_core::DocsiftError;
///
/// let err = DocsiftError::NotBuilt("vocabulary".into());
/// assert!(err.to_string().contains("vocabulary"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DocsiftError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory walk failure, such as an unreadable entry or a dangling link.
    #[error("walk error: {0}")]
    Walk(String),

    /// A structure was used before its build phase ran.
    #[error("{0} has not been built")]
    NotBuilt(String),

    /// Embedding provider failure or malformed provider output.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file or directory was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
