//! The generation service seam and its wire types.

use crate::scene::SceneId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from generating scene candidates.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("API error: {0}")]
    Api(#[from] claude::Error),

    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation returned no candidates")]
    NoCandidates,

    #[error("Failed to parse generation response: {0}")]
    Parse(String),

    #[error("Generation service unavailable: {0}")]
    Unavailable(String),
}

/// How strongly a candidate changes the course of the story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
}

impl Impact {
    /// Lenient parse; anything unrecognized is `Medium`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Impact::Low,
            "high" => Impact::High,
            _ => Impact::Medium,
        }
    }
}

/// One proposed continuation for a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub content: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub impact: Impact,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            content: content.into(),
            characters: Vec::new(),
            impact: Impact::Medium,
            tags: Vec::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_impact(mut self, impact: Impact) -> Self {
        self.impact = impact;
        self
    }

    pub fn with_characters<I, S>(mut self, characters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.characters = characters.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// A request for continuations of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    /// Fully composed prompt describing the story so far and the slot to fill.
    pub context_prompt: String,
    pub target_scene_id: SceneId,
    pub character_names: Vec<String>,
    pub genre: Option<String>,
    pub tone: Option<String>,
}

/// Candidates returned by a generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub options: Vec<Candidate>,
    pub generation_time_seconds: f64,
    #[serde(default)]
    pub cached: bool,
}

/// Produces candidate continuations for a scene.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError>;
}
