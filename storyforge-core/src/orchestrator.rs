//! Generation passes: keep scene text consistent with the current topology.
//!
//! A pass takes a snapshot whose connections already reflect the edits, plus
//! the edits themselves. It re-derives the structure, walks every branch in
//! reading order and regenerates the scenes the edits touched (and any scene
//! that was never written). Scenes shared between branches are decided once;
//! later branches read the decided copy.
//!
//! Branches that share no scenes form independent groups and may be processed
//! concurrently. Output order never depends on scheduling.

use crate::config::EngineConfig;
use crate::error::InputError;
use crate::generation::{
    compose_context_prompt, select_best, Candidate, GenerationError, GenerationRequest, GenerationService,
};
use crate::graph::{validate_snapshot, Branch, BranchId, StoryStructure, StructuralWarning, StructureCache};
use crate::narrative::{build_context, Classifier, KeywordClassifier, Label, NarrativeContext};
use crate::scene::{ChangeAction, ConnectionChange, Scene, SceneId, SceneStatus};
use crate::story::{branch_text, BranchTally, GeneratedStory};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A scene whose generation failed and was replaced by a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneFailure {
    pub scene_id: SceneId,
    pub branch_id: BranchId,
    pub reason: String,
}

/// What a pass saw and did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassInsights {
    pub connections_added: usize,
    pub connections_removed: usize,
    pub total_branches: usize,
    pub orphaned_scenes: usize,
    /// Scenes written by the generator.
    pub regenerated_scenes: usize,
    /// Scenes left as placeholders.
    pub placeholder_scenes: usize,
    /// Written scenes kept as they were.
    pub reused_scenes: usize,
    pub warnings: Vec<StructuralWarning>,
    pub failures: Vec<SceneFailure>,
}

impl PassInsights {
    /// Human-readable summary lines.
    pub fn messages(&self) -> Vec<String> {
        let mut lines = vec![
            format!(
                "{} connection(s) added, {} removed",
                self.connections_added, self.connections_removed
            ),
            format!(
                "{} branch(es), {} orphaned scene(s)",
                self.total_branches, self.orphaned_scenes
            ),
            format!(
                "{} scene(s) regenerated, {} reused, {} placeholder(s)",
                self.regenerated_scenes, self.reused_scenes, self.placeholder_scenes
            ),
        ];
        lines.extend(self.warnings.iter().map(ToString::to_string));
        lines.extend(
            self.failures
                .iter()
                .map(|f| format!("Scene {} needs attention: {}", f.scene_id, f.reason)),
        );
        lines
    }
}

/// Result of one generation pass.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    /// The input snapshot in input order, with changed scenes replaced.
    pub updated_scenes: Vec<Scene>,
    /// One story per non-empty branch, main branch first.
    pub generated_stories: Vec<GeneratedStory>,
    pub insights: PassInsights,
    /// Ids of scenes that differ from the input, in input order.
    pub changed_scene_ids: Vec<SceneId>,
    pub structure: Arc<StoryStructure>,
}

impl PassOutcome {
    /// Only the scenes that changed, for committing back to a store.
    pub fn changed_scenes(&self) -> impl Iterator<Item = &Scene> {
        let changed: HashSet<&SceneId> = self.changed_scene_ids.iter().collect();
        self.updated_scenes.iter().filter(move |s| changed.contains(&s.id))
    }
}

#[derive(Default)]
struct GroupOutcome {
    stories: Vec<(usize, GeneratedStory)>,
    changed: Vec<Scene>,
    failures: Vec<SceneFailure>,
    regenerated: usize,
    placeholders: usize,
    reused: usize,
}

/// Runs generation passes against a generation service.
pub struct Orchestrator {
    generator: Arc<dyn GenerationService>,
    config: EngineConfig,
    genre: Arc<dyn Classifier>,
    tone: Arc<dyn Classifier>,
    structure_cache: Mutex<StructureCache>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn GenerationService>) -> Self {
        Self {
            generator,
            config: EngineConfig::default(),
            genre: Arc::new(KeywordClassifier::genre()),
            tone: Arc::new(KeywordClassifier::tone()),
            structure_cache: Mutex::new(StructureCache::new()),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the genre and tone classifiers.
    pub fn with_classifiers(mut self, genre: Arc<dyn Classifier>, tone: Arc<dyn Classifier>) -> Self {
        self.genre = genre;
        self.tone = tone;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Structure of a snapshot, memoized on its structural hash.
    pub async fn structure(&self, scenes: &[Scene]) -> Arc<StoryStructure> {
        self.structure_cache.lock().await.get_or_analyze(scenes)
    }

    /// Run one generation pass.
    ///
    /// `scenes` must already contain the connection edits described by `events`.
    pub async fn process_structure_change(
        &self,
        scenes: &[Scene],
        events: &[ConnectionChange],
    ) -> Result<PassOutcome, InputError> {
        validate_snapshot(scenes)?;
        let structure = self.structure(scenes).await;

        let branches: Vec<&Branch> = structure.branches().collect();
        let affected = affected_scenes(&branches, events);
        let groups = branch_groups(&branches);

        tracing::info!(
            scenes = scenes.len(),
            events = events.len(),
            branches = branches.len(),
            groups = groups.len(),
            "Starting generation pass"
        );

        let branch_refs = &branches;
        let affected_refs = &affected;
        let outcomes: Vec<GroupOutcome> = stream::iter(groups)
            .map(move |group| self.process_group(group, branch_refs, affected_refs))
            .buffered(self.config.max_concurrent_branches.max(1))
            .collect::<Vec<_>>()
            .await;

        let mut insights = PassInsights {
            connections_added: events.iter().filter(|e| e.action == ChangeAction::Added).count(),
            connections_removed: events.iter().filter(|e| e.action == ChangeAction::Removed).count(),
            total_branches: structure.total_branches,
            orphaned_scenes: structure.orphaned_scenes.len(),
            warnings: structure.warnings.clone(),
            ..PassInsights::default()
        };

        let mut stories = Vec::new();
        let mut changed: HashMap<SceneId, Scene> = HashMap::new();
        for outcome in outcomes {
            stories.extend(outcome.stories);
            changed.extend(outcome.changed.into_iter().map(|s| (s.id.clone(), s)));
            insights.failures.extend(outcome.failures);
            insights.regenerated_scenes += outcome.regenerated;
            insights.placeholder_scenes += outcome.placeholders;
            insights.reused_scenes += outcome.reused;
        }
        stories.sort_by_key(|(idx, _)| *idx);

        let changed_scene_ids: Vec<SceneId> = scenes
            .iter()
            .filter(|s| changed.contains_key(&s.id))
            .map(|s| s.id.clone())
            .collect();
        let updated_scenes: Vec<Scene> = scenes
            .iter()
            .map(|s| changed.remove(&s.id).unwrap_or_else(|| s.clone()))
            .collect();

        tracing::info!(
            regenerated = insights.regenerated_scenes,
            placeholders = insights.placeholder_scenes,
            reused = insights.reused_scenes,
            stories = stories.len(),
            "Generation pass complete"
        );

        Ok(PassOutcome {
            updated_scenes,
            generated_stories: stories.into_iter().map(|(_, story)| story).collect(),
            insights,
            changed_scene_ids,
            structure,
        })
    }

    /// Process the branches of one group in order, sharing decided scenes.
    async fn process_group(&self, group: Vec<usize>, branches: &[&Branch], affected: &HashSet<&str>) -> GroupOutcome {
        let mut outcome = GroupOutcome::default();
        let mut decided: HashMap<SceneId, Scene> = HashMap::new();

        for idx in group {
            let branch = branches[idx];
            let seed = branch_text(&branch.scenes);
            let genre = inferred(self.genre.classify(&seed));
            let tone = inferred(self.tone.classify(&seed));
            let mut tally = BranchTally {
                is_main: idx == 0,
                ..BranchTally::default()
            };
            let mut current: Vec<Scene> = Vec::with_capacity(branch.len());

            for (pos, scene) in branch.scenes.iter().enumerate() {
                if let Some(done) = decided.get(&scene.id) {
                    current.push(done.clone());
                    continue;
                }

                if !affected.contains(scene.id.as_str()) && scene.status == SceneStatus::Written && scene.has_content() {
                    outcome.reused += 1;
                    decided.insert(scene.id.clone(), scene.clone());
                    current.push(scene.clone());
                    continue;
                }

                // Predecessors as decided so far, the rest as given.
                let view: Vec<Scene> = current.iter().chain(&branch.scenes[pos..]).cloned().collect();
                let ctx = build_context(&branch.id, &view, pos);

                let mut updated = scene.clone();
                match self.generate_scene(&ctx, scene, genre.as_deref(), tone.as_deref()).await {
                    Ok(candidate) => {
                        if updated.title.trim().is_empty() {
                            updated.title = candidate.title;
                        }
                        updated.set_content(candidate.content);
                        updated.status = SceneStatus::Written;
                        tally.generated += 1;
                        outcome.regenerated += 1;
                    }
                    Err(error) => {
                        tracing::warn!(
                            scene = %scene.id,
                            branch = %branch.id,
                            error = %error,
                            "Generation failed, inserting placeholder"
                        );
                        updated.set_content(placeholder_text(&ctx));
                        updated.status = SceneStatus::Draft;
                        tally.placeholders += 1;
                        outcome.placeholders += 1;
                        outcome.failures.push(SceneFailure {
                            scene_id: scene.id.clone(),
                            branch_id: branch.id.clone(),
                            reason: error.to_string(),
                        });
                    }
                }

                decided.insert(scene.id.clone(), updated.clone());
                outcome.changed.push(updated.clone());
                current.push(updated);
            }

            let story = GeneratedStory::assemble(
                &branch.id,
                &current,
                tally,
                &*self.genre,
                &*self.tone,
                self.config.words_per_minute,
            );
            outcome.stories.push((idx, story));
        }

        outcome
    }

    async fn generate_scene(
        &self,
        ctx: &NarrativeContext,
        scene: &Scene,
        genre: Option<&str>,
        tone: Option<&str>,
    ) -> Result<Candidate, GenerationError> {
        let request = GenerationRequest {
            context_prompt: compose_context_prompt(ctx, &scene.title, genre, tone),
            target_scene_id: scene.id.clone(),
            character_names: ctx.character_names.clone(),
            genre: genre.map(str::to_string),
            tone: tone.map(str::to_string),
        };

        let limit = self.config.generation_timeout;
        let response = tokio::time::timeout(limit, self.generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(limit))??;

        tracing::debug!(
            scene = %scene.id,
            options = response.options.len(),
            cached = response.cached,
            seconds = response.generation_time_seconds,
            "Received candidates"
        );

        select_best(&response.options, ctx).cloned()
    }
}

/// Event targets plus the scene right after a target in any branch.
///
/// Computed over the whole structure so a scene shared by several branches
/// is judged against every path through it, not only the first one walked.
fn affected_scenes<'a>(branches: &[&'a Branch], events: &'a [ConnectionChange]) -> HashSet<&'a str> {
    let mut affected: HashSet<&str> = events.iter().map(|e| e.to_id.as_str()).collect();
    let targets = affected.clone();
    for branch in branches {
        for pair in branch.scenes.windows(2) {
            if targets.contains(pair[0].id.as_str()) {
                affected.insert(pair[1].id.as_str());
            }
        }
    }
    affected
}

/// Deterministic stand-in text for a scene whose generation failed.
pub fn placeholder_text(ctx: &NarrativeContext) -> String {
    if ctx.is_first() {
        format!(
            "[Placeholder] This is the first scene of the story ({} scenes in this branch). \
             Generation was unavailable; write the opening here or run another pass.",
            ctx.branch_length
        )
    } else {
        format!(
            "[Placeholder] Continuation scene {} of {}. Generation was unavailable; \
             this scene picks up where scene {} left off.",
            ctx.position + 1,
            ctx.branch_length,
            ctx.position
        )
    }
}

fn inferred(label: Label) -> Option<String> {
    (label.confidence > 0.0).then_some(label.name)
}

/// Partition branches into groups connected by shared scenes.
///
/// Groups are ordered by their first branch, members by branch index.
fn branch_groups(branches: &[&Branch]) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..branches.len()).collect();
    let mut owner: HashMap<&str, usize> = HashMap::new();

    for (i, branch) in branches.iter().enumerate() {
        for id in branch.scene_ids() {
            match owner.get(id.as_str()) {
                Some(&j) => {
                    let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                    if a != b {
                        parent[a.max(b)] = a.min(b);
                    }
                }
                None => {
                    owner.insert(id.as_str(), i);
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot: HashMap<usize, usize> = HashMap::new();
    for i in 0..branches.len() {
        let root = find(&mut parent, i);
        let g = *slot.entry(root).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[g].push(i);
    }
    groups
}

fn find(parent: &mut [usize], i: usize) -> usize {
    let mut root = i;
    while parent[root] != root {
        root = parent[root];
    }
    let mut node = i;
    while parent[node] != root {
        let next = parent[node];
        parent[node] = root;
        node = next;
    }
    root
}
