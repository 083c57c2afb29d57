//! Narrative context: what came before a scene, what it established, and how it reads.

pub mod classify;
pub mod context;
pub mod elements;

pub use classify::{detect_themes, Classifier, KeywordClassifier, Label};
pub use context::{build_context, build_context_for, NarrativeContext, CONTEXT_SEPARATOR};
pub use elements::EstablishedElements;
