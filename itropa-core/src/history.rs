//! Bounded undo/redo journal.
//!
//! [`History`] only tracks actions; it never applies them. The caller pops
//! an action and restores `previous_state` (undo) or `new_state` (redo)
//! itself. If applying fails, popping the opposite direction puts the
//! action back where it was.

use std::collections::VecDeque;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::{ActionDraft, HistoryAction};

/// Default number of actions kept on the undo stack.
pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<HistoryAction>,
    future: VecDeque<HistoryAction>,
    capacity: usize,
}

/// Serializable view of the journal for callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryState {
    pub past: Vec<HistoryAction>,
    pub future: Vec<HistoryAction>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            past: VecDeque::with_capacity(capacity),
            future: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stamps `draft` and appends it to the undo stack.
    ///
    /// Evicts the oldest entries beyond capacity and discards the redo stack.
    pub fn record(&mut self, draft: ActionDraft) -> &HistoryAction {
        let action = HistoryAction {
            id: Uuid::new_v4(),
            action_type: draft.action_type,
            timestamp: Utc::now(),
            description: draft.description,
            data: draft.data,
        };
        debug!(
            action = action.action_type.as_str(),
            description = %action.description,
            "Recorded history action"
        );

        self.past.push_back(action);
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
        self.future.clear();

        &self.past[self.past.len() - 1]
    }

    /// Moves the newest action onto the front of the redo stack and returns it.
    pub fn pop_undo(&mut self) -> Option<HistoryAction> {
        let action = self.past.pop_back()?;
        self.future.push_front(action.clone());
        Some(action)
    }

    /// Moves the most recently undone action back onto the undo stack and returns it.
    pub fn pop_redo(&mut self) -> Option<HistoryAction> {
        let action = self.future.pop_front()?;
        self.past.push_back(action.clone());
        Some(action)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Undo stack, oldest first.
    pub fn past(&self) -> impl Iterator<Item = &HistoryAction> {
        self.past.iter()
    }

    /// Redo stack, next-to-redo first.
    pub fn future(&self) -> impl Iterator<Item = &HistoryAction> {
        self.future.iter()
    }

    pub fn state(&self) -> HistoryState {
        HistoryState {
            past: self.past.iter().cloned().collect(),
            future: self.future.iter().cloned().collect(),
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HistoryActionType;

    fn draft(n: usize) -> ActionDraft {
        ActionDraft::new(HistoryActionType::Branch, format!("action {n}"))
    }

    fn descriptions<'a>(actions: impl Iterator<Item = &'a HistoryAction>) -> Vec<String> {
        actions.map(|a| a.description.clone()).collect()
    }

    #[test]
    fn new_history_cannot_undo_or_redo() {
        let mut history = History::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.pop_undo().is_none());
        assert!(history.pop_redo().is_none());
    }

    #[test]
    fn record_stamps_id_and_enables_undo() {
        let mut history = History::default();
        let id = history.record(draft(1)).id;
        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.past().next().map(|a| a.id), Some(id));
    }

    #[test]
    fn undo_then_redo_moves_the_same_action() {
        let mut history = History::default();
        history.record(draft(1));
        history.record(draft(2));

        let undone = history.pop_undo().unwrap();
        assert_eq!(undone.description, "action 2");
        assert!(history.can_redo());

        let redone = history.pop_redo().unwrap();
        assert_eq!(redone.id, undone.id);
        assert_eq!(descriptions(history.past()), vec!["action 1", "action 2"]);
        assert!(!history.can_redo());
    }

    #[test]
    fn redo_order_follows_undo_order() {
        let mut history = History::default();
        for n in 1..=3 {
            history.record(draft(n));
        }
        history.pop_undo();
        history.pop_undo();
        assert_eq!(descriptions(history.future()), vec!["action 2", "action 3"]);
        assert_eq!(history.pop_redo().unwrap().description, "action 2");
    }

    #[test]
    fn recording_after_undo_discards_redo_stack() {
        let mut history = History::default();
        history.record(draft(1));
        history.record(draft(2));
        history.pop_undo();

        history.record(draft(3));
        assert!(!history.can_redo());
        assert_eq!(descriptions(history.past()), vec!["action 1", "action 3"]);
    }

    #[test]
    fn capacity_evicts_oldest_entries() {
        let mut history = History::default();
        for n in 1..=60 {
            history.record(draft(n));
        }
        let past = descriptions(history.past());
        assert_eq!(past.len(), DEFAULT_CAPACITY);
        assert_eq!(past.first().map(String::as_str), Some("action 11"));
        assert_eq!(past.last().map(String::as_str), Some("action 60"));
    }

    #[test]
    fn clear_empties_both_stacks() {
        let mut history = History::new(5);
        history.record(draft(1));
        history.record(draft(2));
        history.pop_undo();
        history.clear();

        let state = history.state();
        assert!(state.past.is_empty());
        assert!(state.future.is_empty());
        assert!(!state.can_undo);
        assert!(!state.can_redo);
    }
}
