//! Caller-misuse errors rejected at the engine boundary.

use crate::scene::SceneId;
use thiserror::Error;

/// The snapshot handed to the engine is not usable as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("duplicate scene id: {0}")]
    DuplicateSceneId(SceneId),

    #[error("unknown scene: {0}")]
    UnknownScene(SceneId),
}
