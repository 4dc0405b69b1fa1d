use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use itropa_core::models::{AnalysisKind, CachedAnalysis, Need};
use uuid::Uuid;

use super::{check_version, Repository, RepositoryError, RepositoryResult};

/// Repository kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    needs: Arc<Mutex<HashMap<Uuid, Need>>>,
    analyses: Arc<Mutex<HashMap<(AnalysisKind, String), CachedAnalysis>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn save_need(&self, need: &Need) -> RepositoryResult<()> {
        let mut needs = self.needs.lock().expect("repository lock poisoned");
        needs.insert(need.id, need.clone());
        Ok(())
    }

    async fn update_need(&self, need: &Need) -> RepositoryResult<()> {
        let mut needs = self.needs.lock().expect("repository lock poisoned");
        let stored = needs
            .get(&need.id)
            .ok_or(RepositoryError::NeedNotFound(need.id))?;
        if check_version(need.id, stored.version, need.version)? {
            needs.insert(need.id, need.clone());
        }
        Ok(())
    }

    async fn get_need(&self, id: Uuid) -> RepositoryResult<Option<Need>> {
        let needs = self.needs.lock().expect("repository lock poisoned");
        Ok(needs.get(&id).cloned())
    }

    async fn all_needs(&self) -> RepositoryResult<Vec<Need>> {
        let needs = self.needs.lock().expect("repository lock poisoned");
        let mut all: Vec<Need> = needs.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(all)
    }

    async fn delete_need(&self, id: Uuid) -> RepositoryResult<bool> {
        let removed = self
            .needs
            .lock()
            .expect("repository lock poisoned")
            .remove(&id)
            .is_some();
        self.analyses
            .lock()
            .expect("repository lock poisoned")
            .retain(|_, analysis| analysis.need_id != id);
        Ok(removed)
    }

    async fn save_analysis(&self, analysis: &CachedAnalysis) -> RepositoryResult<()> {
        let mut analyses = self.analyses.lock().expect("repository lock poisoned");
        analyses.insert((analysis.kind, analysis.key.clone()), analysis.clone());
        Ok(())
    }

    async fn get_analysis(
        &self,
        kind: AnalysisKind,
        key: &str,
    ) -> RepositoryResult<Option<CachedAnalysis>> {
        let analyses = self.analyses.lock().expect("repository lock poisoned");
        Ok(analyses.get(&(kind, key.to_string())).cloned())
    }

    async fn all_analyses(&self) -> RepositoryResult<Vec<CachedAnalysis>> {
        let analyses = self.analyses.lock().expect("repository lock poisoned");
        let mut all: Vec<CachedAnalysis> = analyses.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_analysis(&self, kind: AnalysisKind, key: &str) -> RepositoryResult<bool> {
        let mut analyses = self.analyses.lock().expect("repository lock poisoned");
        Ok(analyses.remove(&(kind, key.to_string())).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use im::Vector;
    use itropa_core::models::{Era, NeedDraft};

    fn need() -> Need {
        Need::from_draft(
            "Rest",
            NeedDraft {
                description: String::new(),
                prior_art: None,
                eras: vec![Era::future("Future", Vector::new())],
                related_needs: vec![],
            },
        )
    }

    #[tokio::test]
    async fn update_rejects_older_versions_and_ignores_repeats() {
        let repo = MemoryRepository::new();
        let v0 = need();
        repo.save_need(&v0).await.unwrap();

        let v1 = v0.with_eras(v0.eras.clone());
        repo.update_need(&v1).await.unwrap();
        repo.update_need(&v1).await.unwrap();

        let err = repo.update_need(&v0).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict { stored: 1, attempted: 0, .. }));
        assert_eq!(repo.get_need(v0.id).await.unwrap().map(|n| n.version), Some(1));
    }

    #[tokio::test]
    async fn update_of_unknown_need_fails() {
        let repo = MemoryRepository::new();
        let err = repo.update_need(&need()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NeedNotFound(_)));
    }

    #[tokio::test]
    async fn delete_need_cascades_to_its_analyses() {
        let repo = MemoryRepository::new();
        let kept = need();
        let doomed = need();
        repo.save_need(&kept).await.unwrap();
        repo.save_need(&doomed).await.unwrap();
        repo.save_analysis(&CachedAnalysis::for_expression(
            AnalysisKind::Mechanism,
            doomed.id,
            "e1",
            serde_json::json!({}),
        ))
        .await
        .unwrap();
        repo.save_analysis(&CachedAnalysis::for_expression(
            AnalysisKind::Mechanism,
            kept.id,
            "e2",
            serde_json::json!({}),
        ))
        .await
        .unwrap();

        assert!(repo.delete_need(doomed.id).await.unwrap());
        let left = repo.all_analyses().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].need_id, kept.id);
    }
}
