//! Testing utilities for the generation engine.
//!
//! `MockGenerator` stands in for a real generation service:
//! - deterministic candidates derived from the request, or scripted ones per scene
//! - injectable failures, empty answers and delays per scene
//! - every request is recorded for later assertions

use crate::generation::{Candidate, GenerationError, GenerationRequest, GenerationResponse, GenerationService, Impact};
use crate::scene::{Scene, SceneId, SceneStatus};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A generation service that answers from a script.
#[derive(Default)]
pub struct MockGenerator {
    scripts: HashMap<SceneId, Vec<Candidate>>,
    failing: HashSet<SceneId>,
    empty: HashSet<SceneId>,
    delays: HashMap<SceneId, Duration>,
    default_delay: Option<Duration>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockGenerator {
    /// A mock that answers every request with generated candidates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer requests for `scene_id` with these candidates.
    pub fn with_script(mut self, scene_id: impl Into<SceneId>, candidates: Vec<Candidate>) -> Self {
        self.scripts.insert(scene_id.into(), candidates);
        self
    }

    /// Fail every request for `scene_id`.
    pub fn fail_on(mut self, scene_id: impl Into<SceneId>) -> Self {
        self.failing.insert(scene_id.into());
        self
    }

    /// Answer requests for `scene_id` with zero candidates.
    pub fn empty_on(mut self, scene_id: impl Into<SceneId>) -> Self {
        self.empty.insert(scene_id.into());
        self
    }

    /// Sleep before answering requests for `scene_id`.
    pub fn delay_on(mut self, scene_id: impl Into<SceneId>, delay: Duration) -> Self {
        self.delays.insert(scene_id.into(), delay);
        self
    }

    /// Sleep before answering every request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    /// Requests received for one scene.
    pub async fn requests_for(&self, scene_id: &str) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.target_scene_id.as_str() == scene_id)
            .cloned()
            .collect()
    }

    pub async fn calls(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Highest number of requests that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// The text the default candidates carry for a scene.
    pub fn generated_text(scene_id: &str) -> String {
        format!("Generated scene {scene_id}. The story moves on from here.")
    }

    fn default_candidates(request: &GenerationRequest) -> Vec<Candidate> {
        let id = request.target_scene_id.as_str();
        let cast = request.character_names.join(" and ");
        let featured = if cast.is_empty() {
            Self::generated_text(id)
        } else {
            format!("{} {cast} are there.", Self::generated_text(id))
        };

        vec![
            Candidate::new(format!("mock-{id}-1"), format!("Scene {id}"), featured)
                .with_characters(request.character_names.iter().cloned())
                .with_impact(Impact::Medium),
            Candidate::new(format!("mock-{id}-2"), format!("Scene {id} (alt)"), "Something else entirely.")
                .with_impact(Impact::Low),
        ]
    }
}

#[async_trait]
impl GenerationService for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().await.push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&request.target_scene_id).copied().or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = &request.target_scene_id;
        if self.failing.contains(id) {
            return Err(GenerationError::Unavailable(format!("scripted failure for {id}")));
        }
        let options = if self.empty.contains(id) {
            Vec::new()
        } else if let Some(script) = self.scripts.get(id) {
            script.clone()
        } else {
            Self::default_candidates(&request)
        };

        Ok(GenerationResponse {
            options,
            generation_time_seconds: delay.map_or(0.0, |d| d.as_secs_f64()),
            cached: false,
        })
    }
}

/// A linear chain of draft scenes `s1 → s2 → … → sN`.
pub fn linear_story(len: usize) -> Vec<Scene> {
    (1..=len)
        .map(|i| {
            let scene = Scene::new(format!("s{i}"), format!("Scene {i}"));
            if i < len {
                scene.with_connection(format!("s{}", i + 1))
            } else {
                scene
            }
        })
        .collect()
}

/// Mark a scene written with the given body.
pub fn written(scene: Scene, content: &str) -> Scene {
    scene.with_content(content).with_status(SceneStatus::Written)
}
