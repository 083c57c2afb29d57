//! Trigger-phrase extraction of established story elements.

use crate::text::{self, Word};
use serde::{Deserialize, Serialize};

/// Maximum phrases kept per category.
pub const MAX_PER_CATEGORY: usize = 5;

/// Words captured after a trigger.
const CAPTURE_WORDS: usize = 3;

const SETTING_TRIGGERS: &[&str] = &["in the", "at the", "inside", "location", "room", "near the"];
const PLOT_TRIGGERS: &[&str] = &["discovered", "revealed", "happened", "decided", "realized", "learned"];
const RELATIONSHIP_TRIGGERS: &[&str] = &[
    "mother", "father", "sister", "brother", "friend", "enemy", "lover", "mentor", "wife", "husband",
    "partner", "rival",
];
const CONFLICT_TRIGGERS: &[&str] = &["conflict", "obstacle", "argument", "fight", "struggle", "against"];

/// Phrases already established by earlier scenes, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstablishedElements {
    pub settings: Vec<String>,
    pub plot_points: Vec<String>,
    pub relationships: Vec<String>,
    pub conflicts: Vec<String>,
}

impl EstablishedElements {
    /// Scan plain text for every category.
    pub fn extract(text: &str) -> Self {
        let words = text::words(text);
        Self {
            settings: scan(&words, SETTING_TRIGGERS),
            plot_points: scan(&words, PLOT_TRIGGERS),
            relationships: scan(&words, RELATIONSHIP_TRIGGERS),
            conflicts: scan(&words, CONFLICT_TRIGGERS),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
            && self.plot_points.is_empty()
            && self.relationships.is_empty()
            && self.conflicts.is_empty()
    }

    /// Non-empty categories with their display label.
    pub fn categories(&self) -> impl Iterator<Item = (&'static str, &[String])> {
        [
            ("Settings", self.settings.as_slice()),
            ("Plot points", self.plot_points.as_slice()),
            ("Relationships", self.relationships.as_slice()),
            ("Conflicts", self.conflicts.as_slice()),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
    }
}

/// Collect the words following each trigger, up to a clause boundary.
fn scan(words: &[Word], triggers: &[&str]) -> Vec<String> {
    let triggers: Vec<Vec<&str>> = triggers
        .iter()
        .map(|t| t.split_whitespace().collect())
        .collect();

    let mut found: Vec<String> = Vec::new();
    for start in 0..words.len() {
        if found.len() >= MAX_PER_CATEGORY {
            break;
        }
        for trigger in &triggers {
            let end = start + trigger.len();
            if end > words.len() || !matches_at(words, start, trigger) {
                continue;
            }
            // A trigger that closes its sentence has nothing to capture.
            if words[end - 1].ends_clause {
                continue;
            }
            let phrase = capture(&words[end..]);
            if !phrase.is_empty() && !found.contains(&phrase) {
                found.push(phrase);
            }
            break;
        }
    }
    found
}

fn matches_at(words: &[Word], start: usize, trigger: &[&str]) -> bool {
    trigger
        .iter()
        .enumerate()
        .all(|(offset, part)| words[start + offset].norm == *part)
}

fn capture(rest: &[Word]) -> String {
    let mut taken = Vec::with_capacity(CAPTURE_WORDS);
    for word in rest.iter().take(CAPTURE_WORDS) {
        taken.push(word.norm.as_str());
        if word.ends_clause {
            break;
        }
    }
    taken.join(" ")
}
