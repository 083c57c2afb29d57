//! Engine configuration.

use std::time::Duration;
use thiserror::Error;

/// Errors from reading configuration out of the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Configuration for generation passes and the Claude-backed generator.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Model to use (defaults to the client's model).
    pub model: Option<String>,

    /// Maximum tokens per generation call.
    pub max_tokens: usize,

    /// Temperature for generation.
    pub temperature: f32,

    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,

    /// Scene-disjoint branch groups processed at the same time.
    pub max_concurrent_branches: usize,

    /// Trailing characters of prior story text sent to the model.
    pub max_context_chars: usize,

    /// Options requested per generation call.
    pub option_count: usize,

    /// Lifetime of a cached generation result.
    pub cache_ttl: Duration,

    /// Maximum cached generation results.
    pub cache_capacity: usize,

    /// Reading speed used for reading-time estimates.
    pub words_per_minute: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1500,
            temperature: 0.8,
            generation_timeout: Duration::from_secs(20),
            max_concurrent_branches: 1,
            max_context_chars: 2000,
            option_count: 3,
            cache_ttl: Duration::from_secs(3600),
            cache_capacity: 256,
            words_per_minute: 200,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by any `STORYFORGE_*` variables that are set.
    ///
    /// Call `dotenvy::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(model) = lookup("STORYFORGE_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = Some(model);
        }
        if let Some(v) = parsed(&lookup, "STORYFORGE_MAX_TOKENS")? {
            config.max_tokens = v;
        }
        if let Some(v) = parsed(&lookup, "STORYFORGE_TEMPERATURE")? {
            config.temperature = v;
        }
        if let Some(secs) = parsed::<u64>(&lookup, "STORYFORGE_TIMEOUT_SECS")? {
            config.generation_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = parsed::<usize>(&lookup, "STORYFORGE_MAX_CONCURRENT_BRANCHES")? {
            config.max_concurrent_branches = v.max(1);
        }
        if let Some(v) = parsed(&lookup, "STORYFORGE_MAX_CONTEXT_CHARS")? {
            config.max_context_chars = v;
        }
        if let Some(v) = parsed::<usize>(&lookup, "STORYFORGE_OPTION_COUNT")? {
            config.option_count = v.max(1);
        }
        if let Some(secs) = parsed::<u64>(&lookup, "STORYFORGE_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Some(v) = parsed(&lookup, "STORYFORGE_CACHE_CAPACITY")? {
            config.cache_capacity = v;
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Values below one are treated as one.
    pub fn with_max_concurrent_branches(mut self, n: usize) -> Self {
        self.max_concurrent_branches = n.max(1);
        self
    }

    pub fn with_max_context_chars(mut self, chars: usize) -> Self {
        self.max_context_chars = chars;
        self
    }

    pub fn with_option_count(mut self, count: usize) -> Self {
        self.option_count = count.max(1);
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_words_per_minute(mut self, wpm: usize) -> Self {
        self.words_per_minute = wpm.max(1);
        self
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_tokens, 1500);
        assert_eq!(config.generation_timeout, Duration::from_secs(20));
        assert_eq!(config.max_concurrent_branches, 1);
        assert_eq!(config.option_count, 3);
        assert_eq!(config.words_per_minute, 200);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("STORYFORGE_MODEL", "claude-3-5-haiku-20241022"),
            ("STORYFORGE_TIMEOUT_SECS", "5"),
            ("STORYFORGE_MAX_CONCURRENT_BRANCHES", " 4 "),
        ]
        .into_iter()
        .collect();
        let config = EngineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-20241022"));
        assert_eq!(config.generation_timeout, Duration::from_secs(5));
        assert_eq!(config.max_concurrent_branches, 4);
        assert_eq!(config.max_tokens, 1500);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = EngineConfig::from_lookup(|k| {
            (k == "STORYFORGE_TEMPERATURE").then(|| "warm".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("STORYFORGE_TEMPERATURE"));
    }

    #[test]
    fn test_builder_clamps() {
        let config = EngineConfig::new()
            .with_max_concurrent_branches(0)
            .with_option_count(0);
        assert_eq!(config.max_concurrent_branches, 1);
        assert_eq!(config.option_count, 1);
    }
}
