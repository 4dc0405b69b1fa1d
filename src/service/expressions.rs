use uuid::Uuid;

use itropa_core::models::*;
use itropa_core::{tree, TreeError};

use crate::generator::GenerationError;

use super::{current_need, lineage, IdeationService, ServiceError, ServiceResult};

impl IdeationService {
    /// Generates children for an expression and attaches them under it.
    ///
    /// `expression` is an id, or a name when the id is no longer present.
    pub async fn branch(&self, need_id: Uuid, expression: &str) -> ServiceResult<Need> {
        let (target, context) = {
            let ws = self.workspace.lock().await;
            let need = current_need(&ws, need_id)?;
            let target = tree::resolve(&need.eras, expression)?.clone();
            let context = need.context(lineage(&need.eras, &target.id));
            (target, context)
        };

        let generated = self.generator.branch(&target, &context).await?;

        let mut ws = self.workspace.lock().await;
        let latest = current_need(&ws, need_id)?;
        let mut taken = tree::collect_ids(&latest.eras);
        let children = tree::assign_unique_ids(generated, &target.id, &mut taken);
        let added = children.len();
        let eras = tree::insert_children(&latest.eras, &target.id, children)?;
        let next = latest.with_eras(eras);

        let draft = ActionDraft::new(
            HistoryActionType::Branch,
            format!("Branched \"{}\" into {added} expressions", target.name),
        )
        .expression_id(target.id.clone());
        self.commit_need(&mut ws, latest, next, draft).await
    }

    /// Adds a user-authored expression under `parent_id`, or as a new root
    /// of the future era.
    pub async fn add_prediction(
        &self,
        need_id: Uuid,
        input: PredictionInput,
    ) -> ServiceResult<Need> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::InvalidInput("prediction name is empty".to_string()));
        }

        let mut ws = self.workspace.lock().await;
        let latest = current_need(&ws, need_id)?;
        let parent_id = match &input.parent_id {
            Some(parent) => Some(tree::resolve(&latest.eras, parent)?.id.clone()),
            None => None,
        };

        let mut taken = tree::collect_ids(&latest.eras);
        let node = tree::assign_unique_id(input.into_expression(""), "user", &mut taken);
        let draft = ActionDraft::new(
            HistoryActionType::AddChild,
            format!("Added prediction \"{}\"", node.name),
        )
        .expression_id(node.id.clone())
        .parent_id(parent_id.clone());

        let eras = match &parent_id {
            Some(parent) => tree::insert_children(&latest.eras, parent, vec![node])?,
            None => tree::insert_root(&latest.eras, node, Era::is_future)?,
        };
        let next = latest.with_eras(eras);
        self.commit_need(&mut ws, latest, next, draft).await
    }

    /// Removes an expression with its whole subtree, then drops cached
    /// analyses that referred to any removed node.
    pub async fn delete_expression(&self, need_id: Uuid, expression_id: &str) -> ServiceResult<Need> {
        let mut ws = self.workspace.lock().await;
        let latest = current_need(&ws, need_id)?;
        let (eras, removed) = tree::remove_by_id(&latest.eras, expression_id)?;
        let next = latest.with_eras(eras);
        let draft = ActionDraft::new(
            HistoryActionType::DeleteExpression,
            format!(
                "Deleted \"{}\" and {} descendants",
                removed.name,
                removed.subtree_len() - 1
            ),
        )
        .expression_id(expression_id);
        let need = self.commit_need(&mut ws, latest, next, draft).await?;

        self.prune_quietly().await;
        Ok(need)
    }

    /// Proposes hybrids of two expressions without changing the tree.
    ///
    /// Results are cached per unordered pair, so `(a, b)` and `(b, a)` share
    /// one generator call.
    pub async fn cross_pollinate(
        &self,
        need_id: Uuid,
        a: &str,
        b: &str,
    ) -> ServiceResult<Vec<IndustryExpression>> {
        let (need, first, second) = {
            let ws = self.workspace.lock().await;
            let need = current_need(&ws, need_id)?;
            let first = tree::resolve(&need.eras, a)?.clone();
            let second = tree::resolve(&need.eras, b)?.clone();
            (need, first, second)
        };
        if first.id == second.id {
            return Err(ServiceError::InvalidInput(
                "cannot cross-pollinate an expression with itself".to_string(),
            ));
        }

        let key = pair_key(need.id, &first.id, &second.id);
        if let Some(cached) = self
            .repository
            .get_analysis(AnalysisKind::CrossPollination, &key)
            .await?
        {
            match serde_json::from_value::<Vec<IndustryExpression>>(cached.body) {
                Ok(hybrids) => {
                    tracing::debug!(%key, "Cross-pollination cache hit");
                    return Ok(hybrids);
                }
                Err(err) => tracing::warn!(%key, error = %err, "Ignoring unreadable cached hybrids"),
            }
        }

        let sources = vec![first.id.clone(), second.id.clone()];
        let hybrids: Vec<IndustryExpression> = self
            .generator
            .cross_pollinate(&first, &second, &need.context(Vec::new()))
            .await?
            .into_iter()
            .map(|hybrid| IndustryExpression {
                cross_pollinated: true,
                source_expressions: sources.clone(),
                ..hybrid
            })
            .collect();

        let body = serde_json::to_value(&hybrids)
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;
        self.repository
            .save_analysis(&CachedAnalysis::for_pair(need.id, &first.id, &second.id, body))
            .await?;
        tracing::info!(need_id = %need.id, %key, count = hybrids.len(), "Cross-pollinated");
        Ok(hybrids)
    }

    /// Inserts a hybrid produced by [`cross_pollinate`](Self::cross_pollinate)
    /// as a new root of the future era.
    pub async fn adopt_hybrid(&self, need_id: Uuid, hybrid: IndustryExpression) -> ServiceResult<Need> {
        let [first, second] = hybrid.source_expressions.as_slice() else {
            return Err(ServiceError::InvalidInput(
                "a hybrid must name exactly two source expressions".to_string(),
            ));
        };
        if first == second {
            return Err(ServiceError::InvalidInput(
                "a hybrid needs two distinct source expressions".to_string(),
            ));
        }

        let mut ws = self.workspace.lock().await;
        let latest = current_need(&ws, need_id)?;
        for source in [first, second] {
            if tree::find_by_id(&latest.eras, source).is_none() {
                return Err(TreeError::ExpressionNotFound(source.clone()).into());
            }
        }
        let mut taken = tree::collect_ids(&latest.eras);
        let node = tree::assign_unique_id(
            IndustryExpression {
                cross_pollinated: true,
                ..hybrid
            },
            "hybrid",
            &mut taken,
        );
        let draft = ActionDraft::new(
            HistoryActionType::CrossPollinate,
            format!(
                "Adopted hybrid \"{}\" of {}",
                node.name,
                node.source_expressions.join(" and ")
            ),
        )
        .expression_id(node.id.clone());

        let eras = tree::insert_root(&latest.eras, node, Era::is_future)?;
        let next = latest.with_eras(eras);
        self.commit_need(&mut ws, latest, next, draft).await
    }
}
