//! Complete-story artifacts assembled from a processed branch.

use crate::graph::BranchId;
use crate::narrative::{detect_themes, Classifier, Label};
use crate::scene::Scene;
use crate::text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Separator placed between scenes in a story's full text.
pub const SCENE_SEPARATOR: &str = "\n\n* * *\n\n";

const UNTITLED: &str = "Untitled Story";
const MAX_THEMES: usize = 3;

/// Descriptive metadata of a generated story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMetadata {
    pub genre: Label,
    pub tone: Label,
    pub themes: Vec<String>,
    pub scene_count: usize,
    pub is_main: bool,
    /// Scenes written by the generator in this pass.
    pub generated_scenes: usize,
    /// Scenes left as placeholders after a failed generation.
    pub placeholder_scenes: usize,
    pub generated_at: DateTime<Utc>,
}

/// One branch read start to finish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedStory {
    pub branch_id: BranchId,
    pub title: String,
    pub full_text: String,
    pub word_count: usize,
    pub reading_time_minutes: usize,
    pub metadata: StoryMetadata,
}

/// Per-branch numbers the orchestrator hands to [`GeneratedStory::assemble`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchTally {
    pub is_main: bool,
    pub generated: usize,
    pub placeholders: usize,
}

impl GeneratedStory {
    /// Assemble the artifact for a branch whose scenes are final.
    pub fn assemble(
        branch_id: &BranchId,
        scenes: &[Scene],
        tally: BranchTally,
        genre: &dyn Classifier,
        tone: &dyn Classifier,
        words_per_minute: usize,
    ) -> Self {
        let title = scenes
            .first()
            .map(|s| s.title.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or(UNTITLED)
            .to_string();

        let full_text = scenes
            .iter()
            .map(render_scene)
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join(SCENE_SEPARATOR);

        let body = branch_text(scenes);
        let word_count = text::word_count(&body);

        Self {
            branch_id: branch_id.clone(),
            title,
            full_text,
            word_count,
            reading_time_minutes: reading_time(word_count, words_per_minute),
            metadata: StoryMetadata {
                genre: genre.classify(&body),
                tone: tone.classify(&body),
                themes: detect_themes(&body, MAX_THEMES),
                scene_count: scenes.len(),
                is_main: tally.is_main,
                generated_scenes: tally.generated,
                placeholder_scenes: tally.placeholders,
                generated_at: Utc::now(),
            },
        }
    }
}

/// Whole minutes needed to read `words`, rounded up.
pub fn reading_time(words: usize, words_per_minute: usize) -> usize {
    words.div_ceil(words_per_minute.max(1))
}

/// Plain text of every scene body, in order.
pub fn branch_text(scenes: &[Scene]) -> String {
    scenes
        .iter()
        .map(Scene::plain_text)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_scene(scene: &Scene) -> String {
    let title = scene.title.trim();
    let body = scene.plain_text();
    match (title.is_empty(), body.is_empty()) {
        (true, true) => String::new(),
        (true, false) => body,
        (false, true) => format!("## {title}"),
        (false, false) => format!("## {title}\n\n{body}"),
    }
}
