use itropa_core::models::*;
use itropa_core::Workspace;

use super::{IdeationService, ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Undo,
    Redo,
}

impl IdeationService {
    /// Reverts the most recent action. `Ok(None)` when there is nothing to undo.
    pub async fn undo(&self) -> ServiceResult<Option<HistoryAction>> {
        let mut ws = self.workspace.lock().await;
        let Some(action) = ws.history_mut().pop_undo() else {
            return Ok(None);
        };

        if let Err(err) = self.apply(&mut ws, &action, Direction::Undo).await {
            ws.history_mut().pop_redo();
            return Err(err);
        }
        tracing::info!(action = action.action_type.as_str(), "Undid: {}", action.description);
        Ok(Some(action))
    }

    /// Re-applies the most recently undone action. `Ok(None)` when there is
    /// nothing to redo.
    pub async fn redo(&self) -> ServiceResult<Option<HistoryAction>> {
        let mut ws = self.workspace.lock().await;
        let Some(action) = ws.history_mut().pop_redo() else {
            return Ok(None);
        };

        if let Err(err) = self.apply(&mut ws, &action, Direction::Redo).await {
            ws.history_mut().pop_undo();
            return Err(err);
        }
        tracing::info!(action = action.action_type.as_str(), "Redid: {}", action.description);
        Ok(Some(action))
    }

    pub async fn clear_history(&self) {
        self.workspace.lock().await.history_mut().clear();
    }

    async fn apply(
        &self,
        ws: &mut Workspace,
        action: &HistoryAction,
        direction: Direction,
    ) -> ServiceResult<()> {
        let corrupt = || ServiceError::CorruptHistory(action.id);
        let data = &action.data;
        let state = match direction {
            Direction::Undo => data.previous_state.as_ref(),
            Direction::Redo => data.new_state.as_ref(),
        };

        match action.action_type {
            kind if kind.replaces_need() => {
                let snapshot = state.and_then(StateSnapshot::as_need).ok_or_else(corrupt)?;
                self.restore_need(ws, snapshot).await
            }
            HistoryActionType::AddNeed | HistoryActionType::DeleteNeed => {
                let adds = (action.action_type == HistoryActionType::AddNeed)
                    == (direction == Direction::Redo);
                if adds {
                    let need = state.and_then(StateSnapshot::as_need).ok_or_else(corrupt)?;
                    self.repository.save_need(need).await?;
                    ws.open(need.clone());
                } else {
                    let id = data.need_id.ok_or_else(corrupt)?;
                    self.repository.delete_need(id).await?;
                    ws.remove(id);
                }
                Ok(())
            }
            HistoryActionType::CloseNeed => {
                let id = data.need_id.ok_or_else(corrupt)?;
                match direction {
                    Direction::Undo => {
                        let stored = self.repository.get_need(id).await?;
                        let need = match (stored, state.and_then(StateSnapshot::as_need)) {
                            (Some(need), _) => need,
                            (None, Some(snapshot)) => snapshot.clone(),
                            (None, None) => return Err(corrupt()),
                        };
                        ws.open(need);
                    }
                    Direction::Redo => {
                        ws.remove(id);
                    }
                }
                Ok(())
            }
            HistoryActionType::FetchMechanism | HistoryActionType::FetchDeepDive => {
                let analysis = data
                    .new_state
                    .as_ref()
                    .and_then(StateSnapshot::as_analysis)
                    .ok_or_else(corrupt)?;
                match direction {
                    Direction::Undo => {
                        self.repository
                            .delete_analysis(analysis.kind, &analysis.key)
                            .await?;
                    }
                    Direction::Redo => self.repository.save_analysis(analysis).await?,
                }
                Ok(())
            }
            _ => Err(corrupt()),
        }
    }

    /// Writes `snapshot`'s content over the live need with the same id.
    async fn restore_need(&self, ws: &mut Workspace, snapshot: &Need) -> ServiceResult<()> {
        let live = match ws.need(snapshot.id) {
            Some(need) => need.clone(),
            None => self
                .repository
                .get_need(snapshot.id)
                .await?
                .ok_or(ServiceError::NeedNotFound(snapshot.id))?,
        };

        let restored = live.restored_from(snapshot);
        self.repository.update_need(&restored).await?;
        ws.replace(restored);
        Ok(())
    }
}
