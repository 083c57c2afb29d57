//! Headless runner for programmatic and scripted use.
//!
//! Loads a snapshot from a [`NodeStore`], applies connection edits, runs one
//! generation pass and commits what changed.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyforge_core::headless::{HeadlessConfig, HeadlessRunner};
//! use storyforge_core::store::JsonFileStore;
//! use storyforge_core::testing::MockGenerator;
//! use storyforge_core::ConnectionChange;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(JsonFileStore::open("story.json").await?);
//!     let mut runner = HeadlessRunner::new(store, Arc::new(MockGenerator::new()), HeadlessConfig::default());
//!
//!     let report = runner.run_pass(&[ConnectionChange::added("s1", "s2")]).await?;
//!     for line in report.outcome.insights.messages() {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

use crate::config::{ConfigError, EngineConfig};
use crate::error::InputError;
use crate::generation::{CachingGenerator, ClaudeGenerator, GenerationError, GenerationService};
use crate::orchestrator::{Orchestrator, PassOutcome};
use crate::scene::{ConnectionChange, Scene, SceneId};
use crate::store::{NodeStore, StoreError};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

/// Errors from a headless run.
#[derive(Debug, Error)]
pub enum HeadlessError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid input: {0}")]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),
}

/// Configuration for a headless runner.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    pub engine: EngineConfig,
    /// Run the pass without writing anything back.
    pub dry_run: bool,
}

impl HeadlessConfig {
    /// Engine settings from `STORYFORGE_*` variables.
    pub fn from_env() -> Result<Self, HeadlessError> {
        Ok(Self {
            engine: EngineConfig::from_env()?,
            dry_run: false,
        })
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// A Claude-backed generator behind the request cache.
    pub fn claude_generator(&self) -> Result<Arc<dyn GenerationService>, HeadlessError> {
        let claude = ClaudeGenerator::from_env(self.engine.clone())?;
        tracing::info!(model = claude.model(), "Using Claude generator");
        Ok(Arc::new(CachingGenerator::new(
            Arc::new(claude),
            self.engine.cache_ttl,
            self.engine.cache_capacity,
        )))
    }
}

/// What one headless pass did.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub outcome: PassOutcome,
    /// Edits that changed the snapshot.
    pub applied: Vec<ConnectionChange>,
    /// Edits that had no effect (unknown source scene or no-op).
    pub skipped: Vec<ConnectionChange>,
    /// Scenes written back to the store.
    pub committed: usize,
}

/// Passes remembered by a runner; older ones are dropped.
pub const HISTORY_LIMIT: usize = 32;

/// Compact record of a finished pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassSummary {
    pub applied: Vec<ConnectionChange>,
    pub skipped: usize,
    pub changed_scene_ids: Vec<SceneId>,
    pub failed_scenes: usize,
    pub committed: usize,
}

impl From<&PassReport> for PassSummary {
    fn from(report: &PassReport) -> Self {
        Self {
            applied: report.applied.clone(),
            skipped: report.skipped.len(),
            changed_scene_ids: report.outcome.changed_scene_ids.clone(),
            failed_scenes: report.outcome.insights.failures.len(),
            committed: report.committed,
        }
    }
}

/// Drives generation passes against a store.
pub struct HeadlessRunner {
    store: Arc<dyn NodeStore>,
    orchestrator: Orchestrator,
    config: HeadlessConfig,
    history: VecDeque<PassSummary>,
}

impl HeadlessRunner {
    pub fn new(store: Arc<dyn NodeStore>, generator: Arc<dyn GenerationService>, config: HeadlessConfig) -> Self {
        let orchestrator = Orchestrator::new(generator).with_config(config.engine.clone());
        Self {
            store,
            orchestrator,
            config,
            history: VecDeque::new(),
        }
    }

    /// Apply `edits` to the stored snapshot, run a pass and commit the result.
    pub async fn run_pass(&mut self, edits: &[ConnectionChange]) -> Result<PassReport, HeadlessError> {
        let mut scenes = self.store.list_scenes().await?;

        let mut applied = Vec::new();
        let mut skipped = Vec::new();
        for edit in edits {
            if edit.apply(&mut scenes) {
                applied.push(edit.clone());
            } else {
                tracing::warn!(from = %edit.from_id, to = %edit.to_id, "Connection edit had no effect");
                skipped.push(edit.clone());
            }
        }

        let outcome = self.orchestrator.process_structure_change(&scenes, &applied).await?;

        let committed = if self.config.dry_run {
            0
        } else {
            let dirty = commit_set(&outcome, &applied);
            self.store.commit_scenes(&dirty).await?;
            dirty.len()
        };

        tracing::info!(
            applied = applied.len(),
            skipped = skipped.len(),
            committed,
            "Headless pass finished"
        );

        let report = PassReport {
            outcome,
            applied,
            skipped,
            committed,
        };
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(PassSummary::from(&report));
        Ok(report)
    }

    /// Current scenes in the store.
    pub async fn scenes(&self) -> Result<Vec<Scene>, HeadlessError> {
        Ok(self.store.list_scenes().await?)
    }

    /// Summaries of the most recent passes, oldest first.
    pub fn history(&self) -> &VecDeque<PassSummary> {
        &self.history
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

/// Regenerated scenes plus the sources of applied edits, in snapshot order.
fn commit_set(outcome: &PassOutcome, applied: &[ConnectionChange]) -> Vec<Scene> {
    let mut ids: HashSet<&SceneId> = outcome.changed_scene_ids.iter().collect();
    ids.extend(applied.iter().map(|e| &e.from_id));
    outcome
        .updated_scenes
        .iter()
        .filter(|s| ids.contains(&s.id))
        .cloned()
        .collect()
}
