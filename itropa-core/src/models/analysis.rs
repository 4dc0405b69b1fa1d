use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kinds of generated analysis that are cached per expression (or per
/// expression pair).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    Mechanism,
    #[serde(rename = "deepdive")]
    DeepDive,
    CrossPollination,
}

impl AnalysisKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mechanism => "mechanism",
            Self::DeepDive => "deepdive",
            Self::CrossPollination => "cross_pollination",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "mechanism" => Some(Self::Mechanism),
            "deepdive" | "deep_dive" => Some(Self::DeepDive),
            "cross_pollination" => Some(Self::CrossPollination),
            _ => None,
        }
    }
}

/// A cached generator result attached to one or two expressions.
///
/// The body is whatever the generator produced for display; the core only
/// cares about which expression ids it refers to, so that records pointing
/// at deleted expressions can be collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedAnalysis {
    pub kind: AnalysisKind,
    /// Lookup key, scoped by need: see [`expression_key`] and [`pair_key`].
    pub key: String,
    pub need_id: Uuid,
    pub expression_ids: Vec<String>,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CachedAnalysis {
    pub fn for_expression(
        kind: AnalysisKind,
        need_id: Uuid,
        expression_id: &str,
        body: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            key: expression_key(need_id, expression_id),
            need_id,
            expression_ids: vec![expression_id.to_string()],
            body,
            created_at: Utc::now(),
        }
    }

    pub fn for_pair(need_id: Uuid, a: &str, b: &str, body: serde_json::Value) -> Self {
        let (first, second) = sorted_pair(a, b);
        Self {
            kind: AnalysisKind::CrossPollination,
            key: pair_key(need_id, a, b),
            need_id,
            expression_ids: vec![first.to_string(), second.to_string()],
            body,
            created_at: Utc::now(),
        }
    }

    /// Whether every expression this record refers to is still in `valid`.
    pub fn is_referenced_by(&self, valid: &std::collections::HashSet<String>) -> bool {
        self.expression_ids.iter().all(|id| valid.contains(id))
    }
}

fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Cache key for an analysis of one expression.
pub fn expression_key(need_id: Uuid, expression_id: &str) -> String {
    format!("{need_id}/{expression_id}")
}

/// Order-independent cache key for an expression pair.
pub fn pair_key(need_id: Uuid, a: &str, b: &str) -> String {
    let (first, second) = sorted_pair(a, b);
    format!("{need_id}/{first}+{second}")
}
