//! Derived structure types: branches and the overall story structure.

use crate::scene::{Scene, SceneId, SceneStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum word count (exclusive) for a branch to count as complete.
pub const COMPLETE_MIN_WORDS: usize = 100;

const EMPTY_BRANCH_ID: &str = "branch:empty";

/// Identifier of a branch, derived from the ids along its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    /// Derive the id of the branch that visits `scenes` in order.
    pub fn from_path<'a>(scenes: impl IntoIterator<Item = &'a SceneId>) -> Self {
        let path: Vec<&str> = scenes.into_iter().map(SceneId::as_str).collect();
        if path.is_empty() {
            return Self(EMPTY_BRANCH_ID.to_string());
        }
        Self(format!("branch:{}", path.join(">")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One root-to-leaf reading order through the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: BranchId,
    pub scenes: Vec<Scene>,
    pub word_count: usize,
    pub char_count: usize,
    pub is_complete: bool,
    /// Last scene this branch shares with an earlier-discovered branch.
    pub branch_point: Option<SceneId>,
    /// The earlier-discovered branch it forks from.
    pub parent: Option<BranchId>,
}

impl Branch {
    /// Build a branch from its scenes in reading order.
    pub fn from_scenes(scenes: Vec<Scene>) -> Self {
        let id = BranchId::from_path(scenes.iter().map(|s| &s.id));
        let word_count: usize = scenes.iter().map(|s| s.word_count).sum();
        let char_count: usize = scenes.iter().map(|s| s.char_count).sum();
        let is_complete = word_count > COMPLETE_MIN_WORDS
            && scenes
                .last()
                .is_some_and(|last| last.status != SceneStatus::Draft);

        Self {
            id,
            scenes,
            word_count,
            char_count,
            is_complete,
            branch_point: None,
            parent: None,
        }
    }

    /// The sentinel used as main branch of an empty story.
    pub fn empty() -> Self {
        Self::from_scenes(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn scene_ids(&self) -> impl Iterator<Item = &SceneId> {
        self.scenes.iter().map(|s| &s.id)
    }

    /// Position of a scene in this branch.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.id.as_str() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn written_count(&self) -> usize {
        self.scenes
            .iter()
            .filter(|s| s.status == SceneStatus::Written)
            .count()
    }
}

/// A non-fatal oddity found while deriving the structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// A connection targets a scene that is not in the snapshot.
    DanglingConnection { from: SceneId, to: SceneId },
    /// A connection leads back onto the path being walked.
    Cycle { at: SceneId, target: SceneId },
    /// A scene is not reachable from any root.
    Orphan { scene: SceneId },
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralWarning::DanglingConnection { from, to } => {
                write!(f, "Scene {from} connects to missing scene {to}; branch truncated")
            }
            StructuralWarning::Cycle { at, target } => {
                write!(f, "Cycle from scene {at} back to {target}; branch truncated")
            }
            StructuralWarning::Orphan { scene } => {
                write!(f, "Scene {scene} is not reachable from any starting scene")
            }
        }
    }
}

/// The derived shape of a story: main branch, alternates and orphans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryStructure {
    pub main_branch: Branch,
    pub alternate_branches: Vec<Branch>,
    pub orphaned_scenes: Vec<Scene>,
    pub total_branches: usize,
    pub is_linear: bool,
    #[serde(default)]
    pub warnings: Vec<StructuralWarning>,
}

impl StoryStructure {
    /// Structure of an empty snapshot.
    pub fn empty() -> Self {
        Self {
            main_branch: Branch::empty(),
            alternate_branches: Vec::new(),
            orphaned_scenes: Vec::new(),
            total_branches: 0,
            is_linear: true,
            warnings: Vec::new(),
        }
    }

    /// All non-empty branches, main first, then alternates in discovery order.
    pub fn branches(&self) -> impl Iterator<Item = &Branch> {
        std::iter::once(&self.main_branch)
            .chain(self.alternate_branches.iter())
            .filter(|b| !b.is_empty())
    }

    /// First branch (in `branches()` order) containing the scene, with its position.
    pub fn branch_containing(&self, id: &str) -> Option<(&Branch, usize)> {
        self.branches()
            .find_map(|branch| branch.position(id).map(|pos| (branch, pos)))
    }

    pub fn is_orphan(&self, id: &str) -> bool {
        self.orphaned_scenes.iter().any(|s| s.id.as_str() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(words: usize) -> String {
        vec!["word"; words].join(" ")
    }

    #[test]
    fn test_branch_id_from_path() {
        let ids = [SceneId::from("a"), SceneId::from("b")];
        assert_eq!(BranchId::from_path(ids.iter()).as_str(), "branch:a>b");
        assert_eq!(BranchId::from_path(std::iter::empty()).as_str(), EMPTY_BRANCH_ID);
    }

    #[test]
    fn test_completion_needs_words_and_finished_ending() {
        let long = Branch::from_scenes(vec![
            Scene::new("a", "A").with_content(filler(60)),
            Scene::new("b", "B")
                .with_content(filler(60))
                .with_status(SceneStatus::Written),
        ]);
        assert_eq!(long.word_count, 120);
        assert!(long.is_complete);

        let draft_ending = Branch::from_scenes(vec![Scene::new("a", "A").with_content(filler(150))]);
        assert!(!draft_ending.is_complete);

        let exactly_100 = Branch::from_scenes(vec![Scene::new("a", "A")
            .with_content(filler(100))
            .with_status(SceneStatus::Written)]);
        assert!(!exactly_100.is_complete);
    }

    #[test]
    fn test_empty_structure() {
        let structure = StoryStructure::empty();
        assert!(structure.main_branch.is_empty());
        assert_eq!(structure.branches().count(), 0);
        assert!(structure.is_linear);
    }
}
