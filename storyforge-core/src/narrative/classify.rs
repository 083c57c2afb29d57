//! Fixed-lexicon text classification.
//!
//! Everything here counts keyword tokens; there is no language model involved.
//! The [`Classifier`] trait keeps the call sites independent of that choice.

use crate::text;
use serde::{Deserialize, Serialize};

/// A class name with a confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f32,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f32) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// Assigns one label to a piece of text.
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Label;
}

const GENRES: &[(&str, &[&str])] = &[
    ("fantasy", &["magic", "dragon", "wizard", "spell", "kingdom", "sword", "elf", "quest", "enchanted"]),
    ("mystery", &["mystery", "detective", "clue", "murder", "suspect", "secret", "investigate", "evidence"]),
    ("romance", &["love", "kiss", "heart", "romance", "passion", "embrace", "beloved", "longing"]),
    ("science fiction", &["ship", "space", "planet", "robot", "laser", "galaxy", "android", "starship", "future"]),
    ("horror", &["blood", "scream", "ghost", "corpse", "terror", "monster", "haunted", "dread"]),
    ("adventure", &["journey", "explore", "map", "treasure", "voyage", "expedition", "island", "escape"]),
];

const TONES: &[(&str, &[&str])] = &[
    ("dark", &["dark", "death", "shadow", "grim", "cold", "blood", "despair", "ruin"]),
    ("hopeful", &["hope", "light", "dawn", "promise", "believe", "bright", "together", "heal"]),
    ("tense", &["danger", "threat", "fear", "suspense", "crisis", "tension", "urgent", "trapped"]),
    ("lighthearted", &["laugh", "smile", "joke", "grin", "giggle", "playful", "cheerful", "fun"]),
    ("melancholic", &["sad", "tears", "grief", "loss", "mourning", "lonely", "memory", "regret"]),
];

pub(crate) const THEMES: &[(&str, &[&str])] = &[
    ("love", &["love", "romance", "relationship", "heart", "affection"]),
    ("betrayal", &["betray", "deceive", "lie", "cheat", "backstab"]),
    ("redemption", &["redeem", "forgive", "second chance", "make amends"]),
    ("power", &["power", "control", "authority", "dominance", "rule"]),
    ("identity", &["identity", "self", "who am i", "belong", "purpose"]),
    ("freedom", &["freedom", "liberty", "escape", "independence", "free"]),
    ("justice", &["justice", "fair", "right", "wrong", "moral"]),
];

/// Picks the lexicon with the most keyword hits.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicons: Vec<(String, Vec<String>)>,
    fallback: String,
}

impl KeywordClassifier {
    /// Build from `(label, keywords)` pairs. Keywords may span several words.
    pub fn new<'a>(
        lexicons: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
        fallback: impl Into<String>,
    ) -> Self {
        Self {
            lexicons: lexicons
                .into_iter()
                .map(|(name, words)| {
                    let words = words.iter().map(|w| w.to_lowercase()).collect();
                    (name.to_string(), words)
                })
                .collect(),
            fallback: fallback.into(),
        }
    }

    pub fn genre() -> Self {
        Self::new(GENRES.iter().copied(), "general")
    }

    pub fn tone() -> Self {
        Self::new(TONES.iter().copied(), "neutral")
    }

    pub fn theme() -> Self {
        Self::new(THEMES.iter().copied(), "none")
    }

    /// Keyword hits per lexicon, in lexicon order.
    pub fn scores(&self, text: &str) -> Vec<(&str, usize)> {
        let found = tokens(text);
        self.lexicons
            .iter()
            .map(|(name, words)| {
                let hits: usize = words.iter().map(|w| count_tokens(&found, w)).sum();
                (name.as_str(), hits)
            })
            .collect()
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Label {
        let scores = self.scores(text);
        let total: usize = scores.iter().map(|(_, hits)| hits).sum();

        let mut best: Option<(&str, usize)> = None;
        for (name, hits) in scores {
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((name, hits));
            }
        }

        match best {
            Some((name, hits)) => Label::new(name, hits as f32 / total as f32),
            None => Label::new(self.fallback.as_str(), 0.0),
        }
    }
}

/// Themes present in the text, strongest first, at most `limit`.
///
/// Ties keep lexicon order.
pub fn detect_themes(text: &str, limit: usize) -> Vec<String> {
    let classifier = KeywordClassifier::theme();
    let mut scored: Vec<(&str, usize)> = classifier
        .scores(text)
        .into_iter()
        .filter(|(_, hits)| *hits > 0)
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .take(limit)
        .map(|(name, _)| name.to_string())
        .collect()
}

fn tokens(text: &str) -> Vec<String> {
    text::words(&text::plain_text(text))
        .into_iter()
        .map(|w| w.norm)
        .collect()
}

// Whole-token matches only, so "spellbound" never counts as "spell".
fn count_tokens(tokens: &[String], keyword: &str) -> usize {
    let parts: Vec<&str> = keyword.split_whitespace().collect();
    if parts.is_empty() {
        return 0;
    }
    tokens
        .windows(parts.len())
        .filter(|window| window.iter().zip(&parts).all(|(t, p)| t == p))
        .count()
}
