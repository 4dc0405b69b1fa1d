use im::Vector;
use serde::{Deserialize, Serialize};

/// One speculative future industry in a need's expression tree.
///
/// Expressions are owned by their parent's `children` sequence (or by the
/// future era for roots). Children are held in a persistent vector, so
/// cloning an expression is cheap and shares every subtree with the
/// original until one side is rebuilt.
///
/// Ids are unique across the whole forest of a need, nested children
/// included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndustryExpression {
    pub id: String,
    pub name: String,
    /// The enabling shift that makes this industry possible.
    #[serde(default)]
    pub mutation: String,
    /// Why this industry follows from the need.
    #[serde(default)]
    pub insight: String,
    #[serde(default)]
    pub inspirations: Vec<Inspiration>,
    #[serde(default)]
    pub children: Vector<IndustryExpression>,
    /// Authored by hand rather than generated.
    #[serde(default)]
    pub user_added: bool,
    #[serde(default)]
    pub cross_pollinated: bool,
    /// Ids of the two expressions merged into this one, if cross-pollinated.
    #[serde(default)]
    pub source_expressions: Vec<String>,
}

/// A reference point the generator drew on for an expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inspiration {
    pub source: String,
    pub mechanism: String,
    #[serde(default)]
    pub twist: Option<String>,
}

impl IndustryExpression {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mutation: String::new(),
            insight: String::new(),
            inspirations: Vec::new(),
            children: Vector::new(),
            user_added: false,
            cross_pollinated: false,
            source_expressions: Vec::new(),
        }
    }

    /// Returns a copy with `children` replaced, sharing everything else.
    pub fn with_children(&self, children: Vector<IndustryExpression>) -> Self {
        Self {
            children,
            ..self.clone()
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of expressions in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Self::subtree_len).sum::<usize>()
    }

    /// Trimmed, case-insensitive name comparison.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}

/// Fields a user fills in when authoring a prediction by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInput {
    pub name: String,
    #[serde(default)]
    pub mutation: String,
    #[serde(default)]
    pub insight: String,
    /// Attach under this expression. `None` adds a root in the future era.
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl PredictionInput {
    /// Builds a user-authored leaf expression with the given id.
    pub fn into_expression(self, id: impl Into<String>) -> IndustryExpression {
        IndustryExpression {
            mutation: self.mutation,
            insight: self.insight,
            user_added: true,
            ..IndustryExpression::new(id, self.name.trim())
        }
    }
}
