//! Scene storage: the node store seam, an in-memory store and a JSON project file.

use crate::scene::Scene;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Current project file version.
pub const PROJECT_VERSION: u32 = 1;

/// Where scenes live between passes.
#[async_trait]
pub trait NodeStore: Send + Sync {
    /// Current snapshot of every scene.
    async fn list_scenes(&self) -> Result<Vec<Scene>, StoreError>;

    /// Insert or replace scenes by id. Scenes not mentioned are left alone.
    async fn commit_scenes(&self, scenes: &[Scene]) -> Result<(), StoreError>;
}

/// Replace scenes by id in place, appending unknown ones in order.
fn merge_scenes(existing: &mut Vec<Scene>, updates: &[Scene]) {
    let index: HashMap<_, _> = existing
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.clone(), i))
        .collect();
    for scene in updates {
        match index.get(&scene.id) {
            Some(&i) => existing[i] = scene.clone(),
            None => existing.push(scene.clone()),
        }
    }
}

/// A store that keeps scenes in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    scenes: Mutex<Vec<Scene>>,
}

impl MemoryStore {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes: Mutex::new(scenes),
        }
    }
}

#[async_trait]
impl NodeStore for MemoryStore {
    async fn list_scenes(&self) -> Result<Vec<Scene>, StoreError> {
        Ok(self.scenes.lock().await.clone())
    }

    async fn commit_scenes(&self, scenes: &[Scene]) -> Result<(), StoreError> {
        merge_scenes(&mut *self.scenes.lock().await, scenes);
        Ok(())
    }
}

/// Project-level metadata kept alongside the scenes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub title: String,
    #[serde(default)]
    pub genre: Option<String>,
}

/// The on-disk project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedProject {
    /// Format version for compatibility checking.
    pub version: u32,

    /// When the file was last written (RFC 3339).
    pub saved_at: String,

    pub project: ProjectInfo,

    pub scenes: Vec<Scene>,
}

impl SavedProject {
    pub fn new(project: ProjectInfo, scenes: Vec<Scene>) -> Self {
        Self {
            version: PROJECT_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            project,
            scenes,
        }
    }

    pub async fn save_json(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        // Write beside the target, then swap it in.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path).await?;
        let saved: Self = serde_json::from_str(&content)?;

        if saved.version != PROJECT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: PROJECT_VERSION,
                found: saved.version,
            });
        }

        Ok(saved)
    }
}

/// A store backed by one JSON project file.
///
/// Every call reads or rewrites the file; a lock serializes commits made
/// through the same store.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Use an existing project file.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        SavedProject::load_json(&path).await?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Write a new project file, replacing any existing one.
    pub async fn create(
        path: impl Into<PathBuf>,
        project: ProjectInfo,
        scenes: Vec<Scene>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        SavedProject::new(project, scenes).save_json(&path).await?;
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn project(&self) -> Result<ProjectInfo, StoreError> {
        Ok(SavedProject::load_json(&self.path).await?.project)
    }
}

#[async_trait]
impl NodeStore for JsonFileStore {
    async fn list_scenes(&self) -> Result<Vec<Scene>, StoreError> {
        Ok(SavedProject::load_json(&self.path).await?.scenes)
    }

    async fn commit_scenes(&self, scenes: &[Scene]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut saved = SavedProject::load_json(&self.path).await?;
        merge_scenes(&mut saved.scenes, scenes);
        saved.saved_at = chrono::Utc::now().to_rfc3339();
        saved.save_json(&self.path).await?;
        tracing::debug!(path = %self.path.display(), committed = scenes.len(), "Committed scenes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneStatus;

    #[tokio::test]
    async fn test_memory_store_merges_by_id() {
        let store = MemoryStore::new(vec![Scene::new("a", "A"), Scene::new("b", "B")]);
        store
            .commit_scenes(&[
                Scene::new("b", "B2").with_status(SceneStatus::Written),
                Scene::new("c", "C"),
            ])
            .await
            .unwrap();

        let scenes = store.list_scenes().await.unwrap();
        let titles: Vec<_> = scenes.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B2", "C"]);
    }
}
