//! Domain state owned by the lifecycle coordinator: the open needs, the
//! active selection and the history journal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::history::History;
use crate::models::Need;

#[derive(Debug, Clone, Default)]
pub struct Workspace {
    needs: Vec<Need>,
    active: Option<Uuid>,
    history: History,
}

/// Read-only view handed to callers after every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    pub needs: Vec<Need>,
    pub active_need: Option<Uuid>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Workspace {
    pub fn new(needs: Vec<Need>, history: History) -> Self {
        let active = needs.first().map(|need| need.id);
        Self {
            needs,
            active,
            history,
        }
    }

    pub fn needs(&self) -> &[Need] {
        &self.needs
    }

    pub fn need(&self, id: Uuid) -> Option<&Need> {
        self.needs.iter().find(|need| need.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Need> {
        let name = name.trim().to_lowercase();
        self.needs
            .iter()
            .find(|need| need.name.trim().to_lowercase() == name)
    }

    pub fn active_need(&self) -> Option<&Need> {
        self.active.and_then(|id| self.need(id))
    }

    /// Selects an open need. Returns `false` if it is not open.
    pub fn set_active(&mut self, id: Uuid) -> bool {
        if self.need(id).is_some() {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    /// Adds a need to the open set (replacing one with the same id) and selects it.
    pub fn open(&mut self, need: Need) {
        let id = need.id;
        if self.replace(need.clone()).is_none() {
            self.needs.push(need);
        }
        self.active = Some(id);
    }

    /// Swaps in a new value for an open need. Returns the old value.
    pub fn replace(&mut self, need: Need) -> Option<Need> {
        let slot = self.needs.iter_mut().find(|open| open.id == need.id)?;
        Some(std::mem::replace(slot, need))
    }

    /// Removes a need from the open set, moving the selection if needed.
    pub fn remove(&mut self, id: Uuid) -> Option<Need> {
        let index = self.needs.iter().position(|need| need.id == id)?;
        let removed = self.needs.remove(index);
        if self.active == Some(id) {
            self.active = self.needs.last().map(|need| need.id);
        }
        Some(removed)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn snapshot(&self) -> WorkspaceSnapshot {
        WorkspaceSnapshot {
            needs: self.needs.clone(),
            active_need: self.active,
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }
}
