//! Claude-backed generation service.

use super::prompt::{branch_prompt, SYSTEM_PROMPT};
use super::service::{
    Candidate, GenerationError, GenerationRequest, GenerationResponse, GenerationService, Impact,
};
use crate::config::EngineConfig;
use async_trait::async_trait;
use claude::{Claude, Message, Request, StopReason};
use serde::Deserialize;
use std::time::Instant;

/// Generates scene candidates with the Anthropic Messages API.
pub struct ClaudeGenerator {
    client: Claude,
    config: EngineConfig,
}

impl ClaudeGenerator {
    /// Wrap an existing client. The client's timeout is aligned with the config.
    pub fn new(client: Claude, config: EngineConfig) -> Self {
        let mut client = client.with_timeout(config.generation_timeout);
        if let Some(model) = &config.model {
            client = client.with_model(model.clone());
        }
        Self { client, config }
    }

    /// Build a client from `ANTHROPIC_API_KEY`.
    pub fn from_env(config: EngineConfig) -> Result<Self, GenerationError> {
        Ok(Self::new(Claude::from_env()?, config))
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    fn build_request(&self, request: &GenerationRequest) -> Request {
        let prompt = branch_prompt(request, self.config.option_count, self.config.max_context_chars);
        Request::new(vec![Message::user(prompt)])
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }
}

#[async_trait]
impl GenerationService for ClaudeGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let started = Instant::now();
        let response = self.client.complete(self.build_request(&request)).await?;
        if response.stop_reason == StopReason::MaxTokens {
            tracing::warn!(
                scene = %request.target_scene_id,
                max_tokens = self.config.max_tokens,
                "Response hit the token limit; trailing options may be cut off"
            );
        }
        let options = parse_candidates(&response.text(), self.config.option_count)?;

        tracing::debug!(
            scene = %request.target_scene_id,
            options = options.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Generated scene candidates"
        );

        Ok(GenerationResponse {
            options,
            generation_time_seconds: started.elapsed().as_secs_f64(),
            cached: false,
        })
    }
}

#[derive(Debug, Deserialize)]
struct BranchesPayload {
    #[serde(default)]
    branches: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BranchEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    content: String,
    #[serde(default)]
    characters: Vec<String>,
    #[serde(default)]
    impact: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// Parse the model's answer into candidates, skipping malformed entries.
pub fn parse_candidates(text: &str, limit: usize) -> Result<Vec<Candidate>, GenerationError> {
    let payload: BranchesPayload = serde_json::from_str(claude::extract_json(text))
        .map_err(|e| GenerationError::Parse(e.to_string()))?;

    let mut candidates = Vec::new();
    for (i, value) in payload.branches.into_iter().enumerate() {
        let entry: BranchEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(index = i, error = %e, "Skipping malformed candidate");
                continue;
            }
        };
        if entry.content.trim().is_empty() {
            tracing::warn!(index = i, "Skipping candidate without content");
            continue;
        }

        let title = if entry.title.trim().is_empty() {
            format!("Option {}", i + 1)
        } else {
            entry.title
        };
        candidates.push(Candidate {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            summary: entry.summary,
            content: entry.content,
            characters: entry.characters,
            impact: entry.impact.as_deref().map(Impact::parse).unwrap_or_default(),
            tags: entry.tags,
        });
        if candidates.len() >= limit {
            break;
        }
    }

    if candidates.is_empty() {
        return Err(GenerationError::NoCandidates);
    }
    Ok(candidates)
}
