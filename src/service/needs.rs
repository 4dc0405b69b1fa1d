use uuid::Uuid;

use itropa_core::models::*;
use itropa_core::tree;

use super::{current_need, IdeationService, ServiceError, ServiceResult};

impl IdeationService {
    /// Researches a new need by name and opens it.
    ///
    /// An open need with the same name is selected instead of being
    /// researched again.
    pub async fn research_need(&self, name: &str) -> ServiceResult<Need> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("need name is empty".to_string()));
        }

        {
            let mut ws = self.workspace.lock().await;
            if let Some(id) = ws.find_by_name(name).map(|need| need.id) {
                ws.set_active(id);
                return current_need(&ws, id);
            }
        }

        let draft = self.generator.research_need(name).await?;
        let mut need = Need::from_draft(name, draft);
        need.eras = tree::with_unique_ids(need.eras);
        tree::validate(&need)?;

        let mut ws = self.workspace.lock().await;
        if let Some(existing) = ws.find_by_name(name).cloned() {
            ws.set_active(existing.id);
            return Ok(existing);
        }
        self.repository.save_need(&need).await?;
        ws.history_mut().record(
            ActionDraft::new(HistoryActionType::AddNeed, format!("Added need \"{}\"", need.name))
                .need_id(need.id)
                .new_state(StateSnapshot::need(need.clone())),
        );
        ws.open(need.clone());
        tracing::info!(need_id = %need.id, name = %need.name, "Researched need");
        Ok(need)
    }

    /// Deletes a need from the store and the workspace. Closed needs are
    /// deleted from the store alone.
    pub async fn delete_need(&self, id: Uuid) -> ServiceResult<()> {
        let mut ws = self.workspace.lock().await;
        let need = match ws.need(id) {
            Some(need) => need.clone(),
            None => self
                .repository
                .get_need(id)
                .await?
                .ok_or(ServiceError::NeedNotFound(id))?,
        };
        self.repository.delete_need(id).await?;
        ws.history_mut().record(
            ActionDraft::new(
                HistoryActionType::DeleteNeed,
                format!("Deleted need \"{}\"", need.name),
            )
            .need_id(id)
            .previous(StateSnapshot::need(need)),
        );
        ws.remove(id);
        tracing::info!(need_id = %id, "Deleted need");

        self.prune_quietly().await;
        Ok(())
    }

    /// Removes a need from the workspace while keeping it in the store.
    pub async fn close_need(&self, id: Uuid) -> ServiceResult<()> {
        let mut ws = self.workspace.lock().await;
        let need = current_need(&ws, id)?;
        ws.history_mut().record(
            ActionDraft::new(HistoryActionType::CloseNeed, format!("Closed need \"{}\"", need.name))
                .need_id(id)
                .previous(StateSnapshot::need(need)),
        );
        ws.remove(id);
        tracing::info!(need_id = %id, "Closed need");
        Ok(())
    }

    /// Opens a stored need and selects it.
    pub async fn open_need(&self, id: Uuid) -> ServiceResult<Need> {
        let mut ws = self.workspace.lock().await;
        if ws.set_active(id) {
            return current_need(&ws, id);
        }

        let need = self
            .repository
            .get_need(id)
            .await?
            .ok_or(ServiceError::NeedNotFound(id))?;
        ws.open(need.clone());
        Ok(need)
    }

    pub async fn activate(&self, id: Uuid) -> ServiceResult<()> {
        let mut ws = self.workspace.lock().await;
        if ws.set_active(id) {
            Ok(())
        } else {
            Err(ServiceError::NeedNotFound(id))
        }
    }
}
