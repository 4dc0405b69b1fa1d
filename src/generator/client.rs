//! HTTP client for a remote content generation service.
//!
//! Configuration is via environment variables:
//! - `ITROPA_GENERATOR_URL` - Base URL (default: `http://localhost:17020/v1`)
//! - `ITROPA_GENERATOR_API_KEY` - Bearer token (optional)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use itropa_core::models::{AnalysisKind, IndustryExpression, NeedContext, NeedDraft};

use super::{extract_json, ContentGenerator, GenerationError, GenerationResult};

/// Default URL for a locally running generator.
const DEFAULT_URL: &str = "http://localhost:17020/v1";

/// Delay before the single retry of a failed request.
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct HttpGenerator {
    base_url: String,
    api_key: Option<String>,
    client: Client,
    backoff: Duration,
}

#[derive(Serialize)]
struct ResearchRequest<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct BranchRequest<'a> {
    expression: &'a IndustryExpression,
    context: &'a NeedContext,
}

#[derive(Serialize)]
struct CrossPollinateRequest<'a> {
    a: &'a IndustryExpression,
    b: &'a IndustryExpression,
    context: &'a NeedContext,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    kind: AnalysisKind,
    expression: &'a IndustryExpression,
    context: &'a NeedContext,
}

/// Generators answer with either `{"expressions": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExpressionList {
    Wrapped { expressions: Vec<IndustryExpression> },
    Bare(Vec<IndustryExpression>),
}

impl ExpressionList {
    fn into_vec(self) -> Vec<IndustryExpression> {
        match self {
            Self::Wrapped { expressions } => expressions,
            Self::Bare(expressions) => expressions,
        }
    }
}

impl HttpGenerator {
    /// Create client from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ITROPA_GENERATOR_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let api_key = std::env::var("ITROPA_GENERATOR_API_KEY").ok();
        Self::new(base_url, api_key)
    }

    /// Create with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
            backoff: RETRY_BACKOFF,
        }
    }

    /// Overrides the retry delay.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Build a request with optional auth header.
    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.post(&url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Posts `body` to `path`, retrying once on transient failures.
    async fn post<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GenerationResult<T> {
        match self.post_once(path, body).await {
            Err(err) if is_transient(&err) => {
                tracing::warn!(path, error = %err, "Generator request failed, retrying");
                tokio::time::sleep(self.backoff).await;
                self.post_once(path, body).await
            }
            result => result,
        }
    }

    async fn post_once<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GenerationResult<T> {
        let response = self.request(path).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited,
                _ => GenerationError::Upstream {
                    status: status.as_u16(),
                    body: text,
                },
            });
        }

        let json = extract_json(&text)
            .ok_or_else(|| GenerationError::Malformed("no JSON value in response".to_string()))?;
        serde_json::from_str(json).map_err(|err| GenerationError::Malformed(err.to_string()))
    }
}

fn is_transient(err: &GenerationError) -> bool {
    match err {
        GenerationError::Http(_) | GenerationError::RateLimited => true,
        GenerationError::Upstream { status, .. } => *status >= 500,
        GenerationError::Malformed(_) | GenerationError::Empty => false,
    }
}

fn non_empty(expressions: Vec<IndustryExpression>) -> GenerationResult<Vec<IndustryExpression>> {
    if expressions.is_empty() {
        Err(GenerationError::Empty)
    } else {
        Ok(expressions)
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn research_need(&self, name: &str) -> GenerationResult<NeedDraft> {
        self.post("/research", &ResearchRequest { name }).await
    }

    async fn branch(
        &self,
        expression: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>> {
        let list: ExpressionList = self
            .post("/branch", &BranchRequest { expression, context })
            .await?;
        non_empty(list.into_vec())
    }

    async fn cross_pollinate(
        &self,
        a: &IndustryExpression,
        b: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>> {
        let list: ExpressionList = self
            .post("/cross-pollinate", &CrossPollinateRequest { a, b, context })
            .await?;
        non_empty(list.into_vec())
    }

    async fn analyze(
        &self,
        kind: AnalysisKind,
        expression: &IndustryExpression,
        context: &NeedContext,
    ) -> GenerationResult<serde_json::Value> {
        self.post(
            "/analyze",
            &AnalyzeRequest {
                kind,
                expression,
                context,
            },
        )
        .await
    }
}
