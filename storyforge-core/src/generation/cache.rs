//! Request-keyed caching around any generation service.

use super::service::{GenerationError, GenerationRequest, GenerationResponse, GenerationService};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Digest of everything that shapes a generation result.
pub fn request_key(request: &GenerationRequest) -> String {
    let mut hasher = blake3::Hasher::new();
    field(&mut hasher, &request.context_prompt);
    optional_field(&mut hasher, request.genre.as_deref());
    optional_field(&mut hasher, request.tone.as_deref());
    hasher.update(&(request.character_names.len() as u64).to_le_bytes());
    for name in &request.character_names {
        field(&mut hasher, name);
    }
    format!("generation:{}", hex::encode(hasher.finalize().as_bytes()))
}

fn field(hasher: &mut blake3::Hasher, value: &str) {
    hasher.update(&(value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn optional_field(hasher: &mut blake3::Hasher, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update(&[1]);
            field(hasher, value);
        }
        None => {
            hasher.update(&[0]);
        }
    }
}

struct Entry {
    response: GenerationResponse,
    stored_at: Instant,
}

/// Serves repeated requests from memory for a limited time.
///
/// Only successful responses are stored. When full, the oldest entry is evicted.
pub struct CachingGenerator {
    inner: Arc<dyn GenerationService>,
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    capacity: usize,
}

impl CachingGenerator {
    pub fn new(inner: Arc<dyn GenerationService>, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity,
        }
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        entries.len()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Asks the inner service even when a live entry exists, replacing it
    /// with the fresh result.
    pub async fn regenerate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let key = request_key(&request);
        tracing::debug!(scene = %request.target_scene_id, "Bypassing generation cache");
        self.fetch(key, request).await
    }

    async fn fetch(&self, key: String, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let response = self.inner.generate(request).await?;
        if !response.options.is_empty() {
            self.store(key, &response).await;
        }
        Ok(response)
    }

    async fn lookup(&self, key: &str) -> Option<GenerationResponse> {
        let mut entries = self.entries.lock().await;
        let expired = match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
        }
        None
    }

    async fn store(&self, key: String, response: &GenerationResponse) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().await;
        let ttl = self.ttl;
        entries.retain(|_, e| e.stored_at.elapsed() < ttl);

        while entries.len() >= self.capacity && !entries.contains_key(&key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                }
                None => break,
            }
        }

        entries.insert(
            key,
            Entry {
                response: response.clone(),
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl GenerationService for CachingGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, GenerationError> {
        let key = request_key(&request);

        if let Some(mut hit) = self.lookup(&key).await {
            tracing::debug!(scene = %request.target_scene_id, "Generation cache hit");
            hit.cached = true;
            return Ok(hit);
        }

        self.fetch(key, request).await
    }
}
