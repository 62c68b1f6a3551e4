//! Error conversion helpers for store operations
//!
//! Provides an extension trait for cleaner error handling with search context.

use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::StoreResult;

/// Extension trait for converting `StoreResult` to `ApplicationResult` with context.
pub trait StoreResultExt<T> {
    /// Add search-name context to a store error.
    ///
    /// # Example
    /// ```ignore
    /// self.store.load(name)
    ///     .with_search_context("load search", name)?;
    /// ```
    fn with_search_context(self, action: &str, search: &str) -> ApplicationResult<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn with_search_context(self, action: &str, search: &str) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {}", action, search),
            source: e,
        })
    }
}
