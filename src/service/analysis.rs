use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use itropa_core::models::*;
use itropa_core::tree;

use super::{current_need, lineage, IdeationService, ServiceError, ServiceResult};

/// Outcome of analysing every expression of a need. Failures do not roll
/// back the successful records.
#[derive(Debug, Clone, Serialize)]
pub struct BatchAnalysis {
    pub records: Vec<CachedAnalysis>,
    pub failures: Vec<AnalysisFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisFailure {
    pub expression_id: String,
    pub error: String,
}

impl IdeationService {
    /// Returns the cached mechanism or deep-dive analysis of an expression,
    /// generating and recording it on a miss.
    pub async fn fetch_analysis(
        &self,
        need_id: Uuid,
        expression: &str,
        kind: AnalysisKind,
    ) -> ServiceResult<CachedAnalysis> {
        let action_type = match kind {
            AnalysisKind::Mechanism => HistoryActionType::FetchMechanism,
            AnalysisKind::DeepDive => HistoryActionType::FetchDeepDive,
            AnalysisKind::CrossPollination => {
                return Err(ServiceError::InvalidInput(
                    "cross-pollination analyses are produced by cross_pollinate".to_string(),
                ))
            }
        };

        let (target, context) = {
            let ws = self.workspace.lock().await;
            let need = current_need(&ws, need_id)?;
            let target = tree::resolve(&need.eras, expression)?.clone();
            let context = need.context(lineage(&need.eras, &target.id));
            (target, context)
        };

        let key = expression_key(need_id, &target.id);
        if let Some(cached) = self.repository.get_analysis(kind, &key).await? {
            return Ok(cached);
        }

        let body = self.generator.analyze(kind, &target, &context).await?;
        let record = CachedAnalysis::for_expression(kind, need_id, &target.id, body);

        let mut ws = self.workspace.lock().await;
        self.repository.save_analysis(&record).await?;
        ws.history_mut().record(
            ActionDraft::new(
                action_type,
                format!("Fetched {} for \"{}\"", kind.as_str(), target.name),
            )
            .need_id(need_id)
            .expression_id(target.id.clone())
            .new_state(StateSnapshot::analysis(record.clone())),
        );
        tracing::info!(%need_id, expression_id = %target.id, kind = kind.as_str(), "Fetched analysis");
        Ok(record)
    }

    /// Fetches `kind` for every expression of a need concurrently.
    pub async fn analyze_all(&self, need_id: Uuid, kind: AnalysisKind) -> ServiceResult<BatchAnalysis> {
        let ids: Vec<String> = {
            let ws = self.workspace.lock().await;
            let need = current_need(&ws, need_id)?;
            tree::expressions(&need.eras)
                .into_iter()
                .map(|node| node.id.clone())
                .collect()
        };

        let results = futures::future::join_all(
            ids.iter()
                .map(|id| self.fetch_analysis(need_id, id, kind)),
        )
        .await;

        let mut batch = BatchAnalysis {
            records: Vec::new(),
            failures: Vec::new(),
        };
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(record) => batch.records.push(record),
                Err(err) => {
                    tracing::warn!(%need_id, expression_id = %id, error = %err, "Analysis failed");
                    batch.failures.push(AnalysisFailure {
                        expression_id: id,
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }

    /// Deletes cached analyses whose need is gone or which refer to an
    /// expression no longer in their need. Returns how many were deleted.
    pub async fn prune_orphans(&self) -> ServiceResult<usize> {
        let _ws = self.workspace.lock().await;
        self.sweep_orphans().await
    }

    /// Callers must hold the workspace lock, so no commit can add a record
    /// between reading the needs and deleting.
    async fn sweep_orphans(&self) -> ServiceResult<usize> {
        let valid: HashMap<Uuid, HashSet<String>> = self
            .repository
            .all_needs()
            .await?
            .into_iter()
            .map(|need| (need.id, tree::collect_ids(&need.eras)))
            .collect();

        let mut removed = 0;
        for analysis in self.repository.all_analyses().await? {
            let referenced = valid
                .get(&analysis.need_id)
                .is_some_and(|ids| analysis.is_referenced_by(ids));
            if !referenced
                && self
                    .repository
                    .delete_analysis(analysis.kind, &analysis.key)
                    .await?
            {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Pruned orphaned analyses");
        }
        Ok(removed)
    }

    /// Orphan cleanup after a deletion, run under the caller's workspace
    /// lock. Failures are logged, not returned.
    pub(super) async fn prune_quietly(&self) {
        if let Err(err) = self.sweep_orphans().await {
            tracing::warn!(error = %err, "Orphan cleanup failed");
        }
    }
}
