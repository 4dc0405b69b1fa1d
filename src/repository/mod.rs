//! Persistence boundary for needs and cached analyses.
//!
//! The lifecycle coordinator only talks to [`Repository`]. Two
//! implementations ship with the crate: the SQLite-backed
//! [`Database`](crate::db::Database) and the in-process [`MemoryRepository`].

mod memory;

pub use memory::MemoryRepository;

use async_trait::async_trait;
use itropa_core::models::{AnalysisKind, CachedAnalysis, Need};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Need not found: {0}")]
    NeedNotFound(Uuid),

    /// A write carried a version that is not newer than the stored one.
    #[error("Stale write for need {id}: stored version {stored}, attempted {attempted}")]
    Conflict { id: Uuid, stored: u64, attempted: u64 },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Inserts a need, or overwrites it unconditionally if it already exists.
    async fn save_need(&self, need: &Need) -> RepositoryResult<()>;

    /// Overwrites an existing need if `need.version` is newer than the stored
    /// version. Writing the stored version again is a no-op.
    async fn update_need(&self, need: &Need) -> RepositoryResult<()>;

    async fn get_need(&self, id: Uuid) -> RepositoryResult<Option<Need>>;

    /// All stored needs, oldest first.
    async fn all_needs(&self) -> RepositoryResult<Vec<Need>>;

    /// Deletes a need together with every analysis cached for it.
    async fn delete_need(&self, id: Uuid) -> RepositoryResult<bool>;

    /// Inserts or replaces the analysis stored under `(kind, key)`.
    async fn save_analysis(&self, analysis: &CachedAnalysis) -> RepositoryResult<()>;

    async fn get_analysis(
        &self,
        kind: AnalysisKind,
        key: &str,
    ) -> RepositoryResult<Option<CachedAnalysis>>;

    async fn all_analyses(&self) -> RepositoryResult<Vec<CachedAnalysis>>;

    async fn delete_analysis(&self, kind: AnalysisKind, key: &str) -> RepositoryResult<bool>;
}

/// Shared version check used by every implementation of `update_need`.
pub(crate) fn check_version(id: Uuid, stored: u64, attempted: u64) -> RepositoryResult<bool> {
    if attempted > stored {
        Ok(true)
    } else if attempted == stored {
        Ok(false)
    } else {
        tracing::warn!(%id, stored, attempted, "Rejected stale need write");
        Err(RepositoryError::Conflict {
            id,
            stored,
            attempted,
        })
    }
}
