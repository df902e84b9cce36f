//! Error conversion helpers with path context
//!
//! Used wherever a file-backed operation (filter state, settings) can fail
//! with an I/O or (de)serialization error.

use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

/// Extension trait converting foreign errors to `ApplicationResult` with context.
pub trait PathContextExt<T> {
    /// Add an action and path to the error.
    ///
    /// # Example
    /// ```ignore
    /// fs.read_to_string(&path)
    ///     .with_path_context("read filter state", &path)?;
    /// ```
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;
}

impl<T, E> PathContextExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, path.display()),
            source: Box::new(e),
        })
    }
}
