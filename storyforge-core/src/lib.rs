//! Branching-narrative engine with AI scene generation.
//!
//! This crate provides:
//! - Graph analysis of scene connections into branches, main branch and orphans
//! - Narrative context assembly for any scene in reading order
//! - Generation passes that regenerate affected scenes through a pluggable
//!   generation service (Claude by default) and assemble per-branch stories
//! - Narrative analysis, scene stores and a headless runner
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use storyforge_core::{ClaudeGenerator, ConnectionChange, EngineConfig, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let generator = Arc::new(ClaudeGenerator::from_env(config.clone())?);
//!     let orchestrator = Orchestrator::new(generator).with_config(config);
//!
//!     let scenes = load_scenes_somehow();
//!     let outcome = orchestrator
//!         .process_structure_change(&scenes, &[ConnectionChange::added("s1", "s2")])
//!         .await?;
//!
//!     for story in &outcome.generated_stories {
//!         println!("{} ({} words)", story.title, story.word_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod generation;
pub mod graph;
pub mod headless;
pub mod narrative;
pub mod orchestrator;
pub mod scene;
pub mod store;
pub mod story;
pub mod testing;
pub mod text;

// Primary public API
pub use config::{ConfigError, EngineConfig};
pub use error::InputError;
pub use generation::{
    CachingGenerator, Candidate, ClaudeGenerator, GenerationError, GenerationRequest, GenerationResponse,
    GenerationService,
};
pub use graph::{analyze_structure, Branch, BranchId, StoryStructure, StructuralWarning};
pub use headless::{HeadlessConfig, HeadlessError, HeadlessRunner, PassReport, PassSummary};
pub use narrative::{build_context, build_context_for, NarrativeContext};
pub use orchestrator::{Orchestrator, PassInsights, PassOutcome};
pub use scene::{ChangeAction, ConnectionChange, Scene, SceneId, SceneStatus};
pub use store::{JsonFileStore, MemoryStore, NodeStore, StoreError};
pub use story::GeneratedStory;
pub use testing::MockGenerator;
