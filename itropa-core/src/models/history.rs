use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CachedAnalysis, Need};

/// One journal entry describing a reversible state transition.
///
/// Undo restores `data.previous_state`, redo re-applies `data.new_state`.
/// Snapshots are whole values rather than diffs; because expression
/// sequences are persistent vectors, a `Need` snapshot shares its subtrees
/// with the live need instead of deep-copying them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryAction {
    pub id: Uuid,
    pub action_type: HistoryActionType,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub data: ActionData,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HistoryActionType {
    AddNeed,
    DeleteNeed,
    CloseNeed,
    Branch,
    AddChild,
    DeleteExpression,
    CrossPollinate,
    FetchMechanism,
    #[serde(rename = "fetch_deepdive")]
    FetchDeepDive,
}

impl HistoryActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddNeed => "add_need",
            Self::DeleteNeed => "delete_need",
            Self::CloseNeed => "close_need",
            Self::Branch => "branch",
            Self::AddChild => "add_child",
            Self::DeleteExpression => "delete_expression",
            Self::CrossPollinate => "cross_pollinate",
            Self::FetchMechanism => "fetch_mechanism",
            Self::FetchDeepDive => "fetch_deepdive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "add_need" => Some(Self::AddNeed),
            "delete_need" => Some(Self::DeleteNeed),
            "close_need" => Some(Self::CloseNeed),
            "branch" => Some(Self::Branch),
            "add_child" => Some(Self::AddChild),
            "delete_expression" => Some(Self::DeleteExpression),
            "cross_pollinate" => Some(Self::CrossPollinate),
            "fetch_mechanism" => Some(Self::FetchMechanism),
            "fetch_deepdive" => Some(Self::FetchDeepDive),
            _ => None,
        }
    }

    /// Actions whose snapshots are whole needs replaced by id on undo/redo.
    pub fn replaces_need(&self) -> bool {
        matches!(
            self,
            Self::Branch | Self::AddChild | Self::DeleteExpression | Self::CrossPollinate
        )
    }
}

/// Payload carried by a history action. Which fields are set depends on the
/// action type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<StateSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<StateSnapshot>,
}

/// A saved value that undo or redo writes back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StateSnapshot {
    Need(Box<Need>),
    Analysis(Box<CachedAnalysis>),
}

impl StateSnapshot {
    pub fn need(need: Need) -> Self {
        Self::Need(Box::new(need))
    }

    pub fn analysis(analysis: CachedAnalysis) -> Self {
        Self::Analysis(Box::new(analysis))
    }

    pub fn as_need(&self) -> Option<&Need> {
        match self {
            Self::Need(need) => Some(need),
            Self::Analysis(_) => None,
        }
    }

    pub fn as_analysis(&self) -> Option<&CachedAnalysis> {
        match self {
            Self::Analysis(analysis) => Some(analysis),
            Self::Need(_) => None,
        }
    }
}

/// An action before the history manager stamps it with an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionDraft {
    pub action_type: HistoryActionType,
    pub description: String,
    pub data: ActionData,
}

impl ActionDraft {
    pub fn new(action_type: HistoryActionType, description: impl Into<String>) -> Self {
        Self {
            action_type,
            description: description.into(),
            data: ActionData::default(),
        }
    }

    pub fn need_id(mut self, need_id: Uuid) -> Self {
        self.data.need_id = Some(need_id);
        self
    }

    pub fn expression_id(mut self, expression_id: impl Into<String>) -> Self {
        self.data.expression_id = Some(expression_id.into());
        self
    }

    pub fn parent_id(mut self, parent_id: Option<String>) -> Self {
        self.data.parent_id = parent_id;
        self
    }

    pub fn previous(mut self, snapshot: StateSnapshot) -> Self {
        self.data.previous_state = Some(snapshot);
        self
    }

    pub fn new_state(mut self, snapshot: StateSnapshot) -> Self {
        self.data.new_state = Some(snapshot);
        self
    }

    /// Shorthand for a whole-need before/after pair.
    pub fn need_transition(self, before: Need, after: Need) -> Self {
        self.need_id(after.id)
            .previous(StateSnapshot::need(before))
            .new_state(StateSnapshot::need(after))
    }
}
