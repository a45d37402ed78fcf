//! Repository factory trait
//!
//! Repositories are created from a configuration value (usually a
//! [`DbClient`](crate::DbClient)) through this trait so callers only depend
//! on the repository traits, not on how the SQL implementations are built.

/// A trait for database repository factories
///
/// Generic over the repository type and the configuration type.
pub trait RepositoryFactory<R, C> {
    /// Create a new repository instance
    ///
    /// # Arguments
    ///
    /// * `config` - The configuration for the repository
    fn create_repository(&self, config: C) -> R;
}
