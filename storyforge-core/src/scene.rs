//! Scene types: the nodes of the story graph and the topology deltas applied to them.

use crate::text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Tag prefix marking a character who appears in a scene.
pub const CHARACTER_TAG_PREFIX: &str = "character:";

/// Stable identifier of a scene, assigned by the node store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Editorial state of a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneStatus {
    #[default]
    Draft,
    Written,
    Suggestion,
}

impl SceneStatus {
    pub fn name(&self) -> &'static str {
        match self {
            SceneStatus::Draft => "draft",
            SceneStatus::Written => "written",
            SceneStatus::Suggestion => "suggestion",
        }
    }
}

/// One narrative unit with directed links to the scenes that may follow it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub id: SceneId,
    #[serde(default)]
    pub title: String,
    /// Scene body; may contain rich-text markup.
    #[serde(default)]
    pub content: String,
    /// Ordered successor ids. Targets that do not exist are tolerated.
    #[serde(default)]
    pub connections: Vec<SceneId>,
    #[serde(default)]
    pub status: SceneStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default, alias = "characterCount")]
    pub char_count: usize,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Scene {
    /// Create an empty draft scene.
    pub fn new(id: impl Into<SceneId>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            connections: Vec::new(),
            status: SceneStatus::Draft,
            tags: Vec::new(),
            word_count: 0,
            char_count: 0,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the body and recompute counts.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self.recount();
        self
    }

    pub fn with_status(mut self, status: SceneStatus) -> Self {
        self.status = status;
        self
    }

    /// Add an outgoing connection.
    pub fn with_connection(mut self, target: impl Into<SceneId>) -> Self {
        self.connect(target);
        self
    }

    pub fn with_connections<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<SceneId>,
    {
        for target in targets {
            self.connect(target);
        }
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Tag a character as present in this scene.
    pub fn with_character(self, name: impl AsRef<str>) -> Self {
        self.with_tag(format!("{CHARACTER_TAG_PREFIX}{}", name.as_ref()))
    }

    /// Append a connection unless it is already present. Returns whether it was added.
    pub fn connect(&mut self, target: impl Into<SceneId>) -> bool {
        let target = target.into();
        if self.connections.contains(&target) {
            return false;
        }
        self.connections.push(target);
        true
    }

    /// Remove a connection. Returns whether it was present.
    pub fn disconnect(&mut self, target: &str) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.as_str() != target);
        before != self.connections.len()
    }

    /// Replace the body, recompute counts and bump `updated_at`.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.recount();
        self.updated_at = Utc::now();
    }

    /// Recompute word and character counts from the body.
    pub fn recount(&mut self) {
        self.word_count = text::word_count(&self.content);
        self.char_count = text::char_count(&self.content);
    }

    /// Body with markup stripped.
    pub fn plain_text(&self) -> String {
        text::plain_text(&self.content)
    }

    pub fn has_content(&self) -> bool {
        !self.content.trim().is_empty()
    }

    /// Character names from `character:` tags, in tag order.
    pub fn character_names(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().filter_map(|tag| {
            tag.strip_prefix(CHARACTER_TAG_PREFIX)
                .map(str::trim)
                .filter(|name| !name.is_empty())
        })
    }
}

/// Kind of topology delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Removed,
}

/// One connection that was added to or removed from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionChange {
    pub from_id: SceneId,
    pub to_id: SceneId,
    pub action: ChangeAction,
}

impl ConnectionChange {
    pub fn added(from: impl Into<SceneId>, to: impl Into<SceneId>) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            action: ChangeAction::Added,
        }
    }

    pub fn removed(from: impl Into<SceneId>, to: impl Into<SceneId>) -> Self {
        Self {
            from_id: from.into(),
            to_id: to.into(),
            action: ChangeAction::Removed,
        }
    }

    /// Apply this change to a scene list in place. Returns whether anything changed.
    pub fn apply(&self, scenes: &mut [Scene]) -> bool {
        let Some(from) = scenes.iter_mut().find(|s| s.id == self.from_id) else {
            return false;
        };
        let changed = match self.action {
            ChangeAction::Added => from.connect(self.to_id.clone()),
            ChangeAction::Removed => from.disconnect(self.to_id.as_str()),
        };
        if changed {
            from.updated_at = Utc::now();
        }
        changed
    }
}
