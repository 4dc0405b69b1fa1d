//! Lifecycle coordinator.
//!
//! Every intent follows the same shape: optional generation without the
//! workspace lock, then a commit under the lock that re-reads the latest
//! need, applies a pure tree operation, persists, records history and swaps
//! the new value in. Persisting first means a failed write leaves memory,
//! history and store as they were.

mod analysis;
mod expressions;
mod history;
mod needs;

pub use analysis::{AnalysisFailure, BatchAnalysis};

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use itropa_core::models::*;
use itropa_core::{tree, History, HistoryState, TreeError, Workspace, WorkspaceSnapshot};

use crate::generator::{ContentGenerator, GenerationError};
use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Need not found: {0}")]
    NeedNotFound(Uuid),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A history entry is missing the snapshot its action type needs.
    #[error("Corrupt history entry {0}")]
    CorruptHistory(Uuid),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

pub struct IdeationService {
    generator: Arc<dyn ContentGenerator>,
    repository: Arc<dyn Repository>,
    workspace: Mutex<Workspace>,
}

impl IdeationService {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        repository: Arc<dyn Repository>,
        workspace: Workspace,
    ) -> Self {
        Self {
            generator,
            repository,
            workspace: Mutex::new(workspace),
        }
    }

    /// Opens every stored need with an empty history of `history_capacity`.
    pub async fn load(
        generator: Arc<dyn ContentGenerator>,
        repository: Arc<dyn Repository>,
        history_capacity: usize,
    ) -> ServiceResult<Self> {
        let needs = repository.all_needs().await?;
        tracing::info!(count = needs.len(), "Loaded needs");
        let workspace = Workspace::new(needs, History::new(history_capacity));
        Ok(Self::new(generator, repository, workspace))
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    pub async fn snapshot(&self) -> WorkspaceSnapshot {
        self.workspace.lock().await.snapshot()
    }

    /// An open need by id.
    pub async fn need(&self, id: Uuid) -> ServiceResult<Need> {
        let ws = self.workspace.lock().await;
        ws.need(id).cloned().ok_or(ServiceError::NeedNotFound(id))
    }

    pub async fn history(&self) -> HistoryState {
        self.workspace.lock().await.history().state()
    }

    /// Persists `after`, journals the transition from `before` and swaps
    /// `after` into the workspace.
    async fn commit_need(
        &self,
        ws: &mut Workspace,
        before: Need,
        after: Need,
        draft: ActionDraft,
    ) -> ServiceResult<Need> {
        self.repository.update_need(&after).await?;
        let action = ws
            .history_mut()
            .record(draft.need_transition(before, after.clone()));
        tracing::info!(
            need_id = %after.id,
            version = after.version,
            action = action.action_type.as_str(),
            "{}",
            action.description
        );
        ws.replace(after.clone());
        Ok(after)
    }
}

fn current_need(ws: &Workspace, id: Uuid) -> ServiceResult<Need> {
    ws.need(id).cloned().ok_or(ServiceError::NeedNotFound(id))
}

/// Names of the ancestors of `id`, root first.
fn lineage(eras: &[Era], id: &str) -> Vec<String> {
    let mut path: Vec<String> = tree::path_to(eras, id)
        .unwrap_or_default()
        .into_iter()
        .map(|node| node.name.clone())
        .collect();
    path.pop();
    path
}
