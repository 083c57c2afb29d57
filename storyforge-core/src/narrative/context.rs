//! Predecessor context for a single target scene.

use super::elements::EstablishedElements;
use crate::error::InputError;
use crate::graph::{analyze_structure, BranchId};
use crate::scene::{Scene, SceneId};

/// Separator placed between predecessor bodies in `context_text`.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Everything upstream of one scene in one branch.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrativeContext {
    pub target_scene_id: SceneId,
    /// Scenes before the target, in reading order.
    pub predecessors: Vec<Scene>,
    pub branch_id: BranchId,
    /// Zero-based position of the target in its branch.
    pub position: usize,
    pub branch_length: usize,
    /// Plain text of the non-empty predecessors, joined with [`CONTEXT_SEPARATOR`].
    pub context_text: String,
    /// Character names in first-seen order, predecessors first, then the target.
    pub character_names: Vec<String>,
    pub established_elements: EstablishedElements,
}

impl NarrativeContext {
    pub fn is_first(&self) -> bool {
        self.position == 0
    }

    pub fn has_history(&self) -> bool {
        !self.context_text.is_empty()
    }
}

/// Build the context for `branch_scenes[index]`.
///
/// `index` past the end of the branch is clamped, treating every scene as a
/// predecessor.
pub fn build_context(branch_id: &BranchId, branch_scenes: &[Scene], index: usize) -> NarrativeContext {
    let index = index.min(branch_scenes.len());
    let predecessors = &branch_scenes[..index];
    let target = branch_scenes.get(index);

    let context_text = predecessors
        .iter()
        .map(Scene::plain_text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    let mut character_names: Vec<String> = Vec::new();
    for scene in predecessors {
        for name in scene.character_names() {
            if !character_names.iter().any(|n| n == name) {
                character_names.push(name.to_string());
            }
        }
    }

    let established_elements = EstablishedElements::extract(&context_text);

    NarrativeContext {
        target_scene_id: target.map(|s| s.id.clone()).unwrap_or_else(|| SceneId::from("")),
        predecessors: predecessors.to_vec(),
        branch_id: branch_id.clone(),
        position: index,
        branch_length: branch_scenes.len(),
        context_text,
        character_names,
        established_elements,
    }
}

/// Resolve the scene in the current structure and build its context.
///
/// The main branch is searched first, then alternates in discovery order. An
/// orphaned scene stands alone with no predecessors.
pub fn build_context_for(scene_id: &str, scenes: &[Scene]) -> Result<NarrativeContext, InputError> {
    let structure = analyze_structure(scenes);

    if let Some((branch, position)) = structure.branch_containing(scene_id) {
        return Ok(build_context(&branch.id, &branch.scenes, position));
    }

    match structure.orphaned_scenes.iter().find(|s| s.id.as_str() == scene_id) {
        Some(orphan) => {
            let alone = std::slice::from_ref(orphan);
            Ok(build_context(&BranchId::from_path([&orphan.id]), alone, 0))
        }
        None => Err(InputError::UnknownScene(SceneId::from(scene_id))),
    }
}
