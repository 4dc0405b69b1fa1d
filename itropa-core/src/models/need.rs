use chrono::{DateTime, Utc};
use im::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::IndustryExpression;

/// Era names containing this marker (case-insensitive) are the mutable future stage.
pub const FUTURE_ERA_MARKER: &str = "future";

/// A research topic: a human need traced through historical eras into a
/// forest of speculative future industries.
///
/// Every tree operation produces a new `Need` value; the previous value stays
/// valid and shares unchanged subtrees with the new one. `version` increases
/// by one on every committed change and is used to reject stale writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Need {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub prior_art: Option<PriorArt>,
    pub eras: Vec<Era>,
    #[serde(default)]
    pub related_needs: Vec<String>,
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named stage in the history of a need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Era {
    pub name: String,
    pub expressions: EraExpressions,
}

/// What an era holds.
///
/// - `Historical`: plain text items, display only
/// - `Future`: the mutable expression forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum EraExpressions {
    Historical(Vec<String>),
    Future(Vector<IndustryExpression>),
}

/// Reference material used as generation context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorArt {
    #[serde(default)]
    pub current_solutions: Vec<PriorArtItem>,
    #[serde(default)]
    pub historical_precedents: Vec<PriorArtItem>,
    #[serde(default)]
    pub adjacent_domains: Vec<PriorArtItem>,
    #[serde(default)]
    pub natural_analogues: Vec<PriorArtItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorArtItem {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Generator output for a freshly researched need, before it gets an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedDraft {
    pub description: String,
    #[serde(default)]
    pub prior_art: Option<PriorArt>,
    pub eras: Vec<Era>,
    #[serde(default)]
    pub related_needs: Vec<String>,
}

/// Need-level context handed to the content generator alongside a node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedContext {
    pub need_name: String,
    pub need_description: String,
    #[serde(default)]
    pub prior_art: Option<PriorArt>,
    /// Names of the ancestors of the target expression, root first.
    #[serde(default)]
    pub lineage: Vec<String>,
}

impl Era {
    pub fn historical(name: impl Into<String>, items: Vec<String>) -> Self {
        Self {
            name: name.into(),
            expressions: EraExpressions::Historical(items),
        }
    }

    pub fn future(name: impl Into<String>, expressions: Vector<IndustryExpression>) -> Self {
        Self {
            name: name.into(),
            expressions: EraExpressions::Future(expressions),
        }
    }

    /// Whether the era's name marks it as the future stage.
    pub fn is_future(&self) -> bool {
        self.name.to_lowercase().contains(FUTURE_ERA_MARKER)
    }

    /// The expression forest, if this era holds one.
    pub fn expressions(&self) -> Option<&Vector<IndustryExpression>> {
        match &self.expressions {
            EraExpressions::Future(expressions) => Some(expressions),
            EraExpressions::Historical(_) => None,
        }
    }
}

impl Need {
    pub fn from_draft(name: impl Into<String>, draft: NeedDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: draft.description,
            prior_art: draft.prior_art,
            eras: draft.eras,
            related_needs: draft.related_needs,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the next version of this need with `eras` swapped in.
    pub fn with_eras(&self, eras: Vec<Era>) -> Self {
        Self {
            eras,
            version: self.version + 1,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }

    /// Returns `snapshot`'s content as the next version after `self`.
    ///
    /// Used when restoring an undo/redo snapshot over the live need so the
    /// version keeps increasing.
    pub fn restored_from(&self, snapshot: &Need) -> Self {
        Self {
            version: self.version + 1,
            updated_at: Utc::now(),
            ..snapshot.clone()
        }
    }

    /// The mutable future era, if present.
    pub fn future_era(&self) -> Option<&Era> {
        self.eras.iter().find(|era| era.is_future())
    }

    pub fn context(&self, lineage: Vec<String>) -> NeedContext {
        NeedContext {
            need_name: self.name.clone(),
            need_description: self.description.clone(),
            prior_art: self.prior_art.clone(),
            lineage,
        }
    }
}
