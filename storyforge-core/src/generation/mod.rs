//! Scene generation: the service seam, its Claude and caching implementations,
//! prompt composition and candidate selection.

pub mod cache;
pub mod claude;
pub mod prompt;
pub mod selector;
pub mod service;

pub use self::cache::{request_key, CachingGenerator};
pub use self::claude::{parse_candidates, ClaudeGenerator};
pub use prompt::{branch_prompt, compose_context_prompt, SYSTEM_PROMPT};
pub use selector::{score_candidate, select_best};
pub use service::{Candidate, GenerationError, GenerationRequest, GenerationResponse, GenerationService, Impact};
