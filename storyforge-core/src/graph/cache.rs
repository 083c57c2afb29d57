//! Structure memoization keyed by a content hash of the snapshot.

use super::analyzer::analyze_structure;
use super::branch::StoryStructure;
use crate::scene::Scene;
use std::sync::Arc;

/// Hex BLAKE3 digest over everything the derived structure depends on.
///
/// Timestamps and notes are excluded; touching them does not change the shape
/// of the story.
pub fn structural_hash(scenes: &[Scene]) -> String {
    let mut hasher = blake3::Hasher::new();
    for scene in scenes {
        field(&mut hasher, scene.id.as_str());
        field(&mut hasher, &scene.title);
        field(&mut hasher, &scene.content);
        field(&mut hasher, scene.status.name());
        hasher.update(&(scene.word_count as u64).to_le_bytes());
        hasher.update(&(scene.char_count as u64).to_le_bytes());
        hasher.update(&(scene.connections.len() as u64).to_le_bytes());
        for target in &scene.connections {
            field(&mut hasher, target.as_str());
        }
        hasher.update(&(scene.tags.len() as u64).to_le_bytes());
        for tag in &scene.tags {
            field(&mut hasher, tag);
        }
    }
    hex::encode(hasher.finalize().as_bytes())
}

// Length-prefixed so adjacent fields cannot collide.
fn field(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

/// Remembers the structure of the most recently analyzed snapshot.
#[derive(Debug, Default)]
pub struct StructureCache {
    last: Option<(String, Arc<StoryStructure>)>,
    hits: u64,
    misses: u64,
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached structure when the snapshot is unchanged, otherwise analyze it.
    pub fn get_or_analyze(&mut self, scenes: &[Scene]) -> Arc<StoryStructure> {
        let key = structural_hash(scenes);
        if let Some((cached_key, structure)) = &self.last {
            if *cached_key == key {
                self.hits += 1;
                tracing::debug!("Structure cache hit");
                return Arc::clone(structure);
            }
        }

        self.misses += 1;
        let structure = Arc::new(analyze_structure(scenes));
        self.last = Some((key, Arc::clone(&structure)));
        structure
    }

    pub fn clear(&mut self) {
        self.last = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneStatus;

    fn snapshot() -> Vec<Scene> {
        vec![
            Scene::new("a", "A").with_connection("b").with_content("It began."),
            Scene::new("b", "B"),
        ]
    }

    #[test]
    fn test_hash_ignores_timestamps() {
        let scenes = snapshot();
        let mut touched = scenes.clone();
        touched[0].updated_at = touched[0].updated_at + chrono::Duration::seconds(5);
        assert_eq!(structural_hash(&scenes), structural_hash(&touched));
    }

    #[test]
    fn test_hash_tracks_topology_and_status() {
        let scenes = snapshot();
        let base = structural_hash(&scenes);

        let mut rewired = scenes.clone();
        rewired[0].disconnect("b");
        assert_ne!(base, structural_hash(&rewired));

        let mut written = scenes.clone();
        written[1].status = SceneStatus::Written;
        assert_ne!(base, structural_hash(&written));

        let mut split = scenes;
        split[0].title = "AB".into();
        split[0].content = "t began.".into();
        assert_ne!(base, structural_hash(&split));
    }

    #[test]
    fn test_cache_reuses_structure() {
        let mut cache = StructureCache::new();
        let scenes = snapshot();
        let first = cache.get_or_analyze(&scenes);
        let second = cache.get_or_analyze(&scenes);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        let mut changed = scenes;
        changed.push(Scene::new("c", "C"));
        let third = cache.get_or_analyze(&changed);
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.orphaned_scenes.len(), 1);
    }
}
