//! Binding errors.

use thiserror::Error;

/// Errors from binding-spec parsing and registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// A path string could not be parsed.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The offending path string.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A widget declared a data binding but carries no id to key the
    /// live binding on.
    #[error("Widget has a data binding but no id")]
    MissingWidgetId,
}

impl BindingError {
    /// Create an invalid-path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for binding operations.
pub type BindingResult<T> = Result<T, BindingError>;
