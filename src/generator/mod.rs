//! Content generation boundary.
//!
//! The coordinator asks a [`ContentGenerator`] for new eras, children,
//! hybrids and analyses. The shipped implementation is [`HttpGenerator`],
//! which talks JSON to a generation service; tests plug in stubs.

mod client;
mod extract;

pub use client::HttpGenerator;
pub use extract::extract_json;

use async_trait::async_trait;
use itropa_core::models::{AnalysisKind, IndustryExpression, NeedContext, NeedDraft};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generator request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Generator is rate limited")]
    RateLimited,

    #[error("Generator returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Generator returned malformed output: {0}")]
    Malformed(String),

    #[error("Generator returned no results")]
    Empty,
}

pub type GenerationResult<T> = std::result::Result<T, GenerationError>;

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Researches a need by name: description, prior art and eras.
    async fn research_need(&self, name: &str) -> GenerationResult<NeedDraft>;

    /// Proposes child expressions for `expression`.
    async fn branch(
        &self,
        expression: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>>;

    /// Proposes hybrids combining `a` and `b`.
    async fn cross_pollinate(
        &self,
        a: &IndustryExpression,
        b: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>>;

    /// Produces a free-form analysis of `expression`.
    async fn analyze(
        &self,
        kind: AnalysisKind,
        expression: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<serde_json::Value>;
}
