//! Container registry port for tag and manifest queries.

use std::future::Future;
use std::pin::Pin;

use super::PortError;

/// Boxed future type alias used by [`RegistryClient`] to keep the trait dyn-compatible.
pub type RegistryFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PortError>> + Send + 'a>>;

/// Read-only access to an OCI registry.
///
/// Implementations may be called concurrently from many tasks.
pub trait RegistryClient: Send + Sync {
    /// Lists every tag in `repository` (e.g. `konflux-ci/tekton-catalog/task-init`),
    /// following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if the first page cannot be fetched.
    fn list_tags(&self, repository: &str) -> RegistryFuture<'_, Vec<String>>;

    /// Returns the manifest digest a tag points at, or `None` if the
    /// registry did not report one.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status.
    fn manifest_digest(&self, repository: &str, tag: &str) -> RegistryFuture<'_, Option<String>>;
}
