#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use im::vector;
use tokio::sync::Notify;
use uuid::Uuid;

use itropa::generator::{ContentGenerator, GenerationError, GenerationResult};
use itropa::repository::{MemoryRepository, Repository, RepositoryError, RepositoryResult};
use itropa::service::IdeationService;
use itropa_core::models::*;

/// Deterministic generator.
///
/// - research: two historical items and future roots `e1` "Vat Meat" and
///   `e2` "Kelp Farming"
/// - branch: children `<id>-1`, `<id>-2`
/// - cross-pollinate: one hybrid without an id
/// - analyze: echoes kind and id, failing for ids in `failing`
#[derive(Default)]
pub struct StubGenerator {
    pub branch_calls: AtomicUsize,
    pub cross_calls: AtomicUsize,
    pub analyze_calls: AtomicUsize,
    pub offline: AtomicBool,
    pub failing: Mutex<HashSet<String>>,
}

impl StubGenerator {
    pub fn fail_for(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    fn check_online(&self) -> GenerationResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(GenerationError::Upstream {
                status: 503,
                body: "offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ContentGenerator for StubGenerator {
    async fn research_need(&self, name: &str) -> GenerationResult<NeedDraft> {
        self.check_online()?;
        Ok(NeedDraft {
            description: format!("How people meet the need for {name}"),
            prior_art: None,
            eras: vec![
                Era::historical("Agrarian", vec!["Granaries".to_string()]),
                Era::historical("Industrial", vec!["Canning".to_string()]),
                Era::future(
                    "Future (2040+)",
                    vector![
                        IndustryExpression::new("e1", "Vat Meat"),
                        IndustryExpression::new("e2", "Kelp Farming"),
                    ],
                ),
            ],
            related_needs: vec!["Water".to_string()],
        })
    }

    async fn branch(
        &self,
        expression: &IndustryExpression,
        _context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>> {
        self.check_online()?;
        self.branch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            IndustryExpression::new(format!("{}-1", expression.id), format!("{} A", expression.name)),
            IndustryExpression::new(format!("{}-2", expression.id), format!("{} B", expression.name)),
        ])
    }

    async fn cross_pollinate(
        &self,
        a: &IndustryExpression,
        b: &IndustryExpression,
        _context: &NeedContext,
    ) -> GenerationResult<Vec<IndustryExpression>> {
        self.check_online()?;
        self.cross_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![IndustryExpression::new("", format!("{} x {}", a.name, b.name))])
    }

    async fn analyze(
        &self,
        kind: AnalysisKind,
        expression: &IndustryExpression,
        _context: &NeedContext,
    ) -> GenerationResult<serde_json::Value> {
        self.check_online()?;
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&expression.id) {
            return Err(GenerationError::Malformed("unparseable".to_string()));
        }
        Ok(serde_json::json!({ "kind": kind.as_str(), "expression": expression.id }))
    }
}

/// Pauses the next `all_analyses` call until released.
#[derive(Default)]
pub struct ScanGate {
    pub entered: Notify,
    pub release: Notify,
}

/// Memory repository whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyRepository {
    pub inner: MemoryRepository,
    pub fail_writes: AtomicBool,
    scan_gate: Mutex<Option<Arc<ScanGate>>>,
}

impl FlakyRepository {
    pub fn gate_analysis_scan(&self) -> Arc<ScanGate> {
        let gate = Arc::new(ScanGate::default());
        *self.scan_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    fn check(&self) -> RepositoryResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(RepositoryError::Backend(anyhow::anyhow!("disk full")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Repository for FlakyRepository {
    async fn save_need(&self, need: &Need) -> RepositoryResult<()> {
        self.check()?;
        self.inner.save_need(need).await
    }

    async fn update_need(&self, need: &Need) -> RepositoryResult<()> {
        self.check()?;
        self.inner.update_need(need).await
    }

    async fn get_need(&self, id: Uuid) -> RepositoryResult<Option<Need>> {
        self.inner.get_need(id).await
    }

    async fn all_needs(&self) -> RepositoryResult<Vec<Need>> {
        self.inner.all_needs().await
    }

    async fn delete_need(&self, id: Uuid) -> RepositoryResult<bool> {
        self.check()?;
        self.inner.delete_need(id).await
    }

    async fn save_analysis(&self, analysis: &CachedAnalysis) -> RepositoryResult<()> {
        self.check()?;
        self.inner.save_analysis(analysis).await
    }

    async fn get_analysis(
        &self,
        kind: AnalysisKind,
        key: &str,
    ) -> RepositoryResult<Option<CachedAnalysis>> {
        self.inner.get_analysis(kind, key).await
    }

    async fn all_analyses(&self) -> RepositoryResult<Vec<CachedAnalysis>> {
        let gate = self.scan_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.inner.all_analyses().await
    }

    async fn delete_analysis(&self, kind: AnalysisKind, key: &str) -> RepositoryResult<bool> {
        self.check()?;
        self.inner.delete_analysis(kind, key).await
    }
}

pub struct Harness {
    pub service: Arc<IdeationService>,
    pub generator: Arc<StubGenerator>,
    pub repository: Arc<FlakyRepository>,
}

pub async fn harness() -> Harness {
    harness_with_capacity(itropa_core::DEFAULT_CAPACITY).await
}

pub async fn harness_with_capacity(capacity: usize) -> Harness {
    let generator = Arc::new(StubGenerator::default());
    let repository = Arc::new(FlakyRepository::default());
    let service = IdeationService::load(generator.clone(), repository.clone(), capacity)
        .await
        .expect("Failed to load service");
    Harness {
        service: Arc::new(service),
        generator,
        repository,
    }
}

/// Ids of the children of `id`, in order.
pub fn child_ids(need: &Need, id: &str) -> Vec<String> {
    itropa_core::tree::find_by_id(&need.eras, id)
        .map(|node| node.children.iter().map(|c| c.id.clone()).collect())
        .unwrap_or_default()
}

/// Ids of the future-era roots, in order.
pub fn root_ids(need: &Need) -> Vec<String> {
    itropa_core::tree::roots(&need.eras)
        .map(|node| node.id.clone())
        .collect()
}
