//! Narrative analysis over a sequence of scenes in reading order.
//!
//! Two levels: [`quick_insights`] for cheap counts and suggestions, and
//! [`analyze_narrative`] for the full "narrative DNA" (emotional arc,
//! character development, theme consistency, pacing). All measures are
//! lexicon counts over the plain text; substrings count, so "fearful"
//! registers as "fear".

use crate::graph::Branch;
use crate::narrative::classify::THEMES;
use crate::scene::{Scene, SceneStatus};
use crate::text;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Fewest words worth a full analysis.
pub const MIN_ANALYSIS_WORDS: usize = 100;

const EMOTIONS: &[(&str, &[&str])] = &[
    ("tension", &["conflict", "tension", "danger", "threat", "fear", "suspense", "crisis"]),
    ("joy", &["happy", "joy", "laugh", "smile", "celebration", "triumph"]),
    ("sadness", &["sad", "cry", "tears", "grief", "loss", "mourning"]),
    ("anger", &["angry", "rage", "fury", "mad", "furious", "hostile"]),
    ("love", &["love", "romance", "affection", "tender", "caring", "devotion"]),
];
const TURNING_POINTS: &[&str] = &["climax", "confrontation", "revelation"];

const COMMON_WORDS: &[&str] = &["The", "And", "But", "When", "Where", "What", "How", "Why", "This", "That"];
const GROWTH_WORDS: &[&str] = &[
    "learned", "realized", "understood", "changed", "grew", "developed", "discovered", "found", "became",
    "transformed",
];
const ARC_WORDS: &[&str] = &["changed", "learned", "grew", "realized", "became", "transformed"];

const ACTION_WORDS: &[&str] = &["ran", "rushed", "fought", "attacked", "chased", "battle", "explosion"];
const DESCRIPTION_WORDS: &[&str] = &["looked", "appeared", "seemed", "was", "were", "beautiful", "dark"];

const MAX_CHARACTERS: usize = 10;
const MAX_PAIRED_CHARACTERS: usize = 5;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid name regex"));
static SENTENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("valid sentence regex"));

/// Errors from narrative analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("No scenes to analyze")]
    Empty,

    #[error("Story too short to analyze: {words} words, need at least {MIN_ANALYSIS_WORDS}")]
    TooShort { words: usize },
}

/// Cheap counts and suggestions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickInsights {
    pub word_count: usize,
    pub char_count: usize,
    pub scene_count: usize,
    pub average_words_per_scene: usize,
    pub status_distribution: BTreeMap<String, usize>,
    pub suggestions: Vec<String>,
}

/// Counts and writing suggestions for a set of scenes.
pub fn quick_insights(scenes: &[Scene]) -> Result<QuickInsights, AnalysisError> {
    if scenes.is_empty() {
        return Err(AnalysisError::Empty);
    }

    let word_count: usize = scenes.iter().map(|s| text::word_count(&s.content)).sum();
    let char_count: usize = scenes.iter().map(|s| text::char_count(&s.content)).sum();
    let average_words_per_scene = word_count / scenes.len();

    let mut status_distribution = BTreeMap::new();
    for scene in scenes {
        *status_distribution.entry(scene.status.name().to_string()).or_insert(0) += 1;
    }

    let count = |status: SceneStatus| status_distribution.get(status.name()).copied().unwrap_or(0);
    let mut suggestions = Vec::new();
    if average_words_per_scene < 200 {
        suggestions.push("Consider expanding scenes; the average scene is quite short".to_string());
    }
    if count(SceneStatus::Draft) > count(SceneStatus::Written) {
        suggestions.push("You have more draft scenes than written ones".to_string());
    }
    if scenes.len() == 1 {
        suggestions.push("Try connecting more scenes to build out your story".to_string());
    }

    Ok(QuickInsights {
        word_count,
        char_count,
        scene_count: scenes.len(),
        average_words_per_scene,
        status_distribution,
        suggestions,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalPoint {
    /// One-based scene number in reading order.
    pub scene: usize,
    pub title: String,
    pub tension: u32,
    pub dominant_emotion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmotionalArc {
    /// Mean tension over all scenes.
    pub tension_score: u32,
    /// Title of the first scene with the highest tension.
    pub peak_moment: Option<String>,
    pub points: Vec<EmotionalPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub first: String,
    pub second: String,
    /// Sentences naming both, capped at 10.
    pub strength: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterArc {
    pub name: String,
    /// Sentences pairing the name with a development word, capped at 10.
    pub arc_strength: u32,
    pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDevelopment {
    pub characters: Vec<String>,
    /// Percentage, 0 to 100.
    pub protagonist_growth: u32,
    pub relationships: Vec<Relationship>,
    pub arcs: Vec<CharacterArc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeMention {
    pub scene: usize,
    pub title: String,
    pub mentions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeConsistency {
    pub core_theme: Option<String>,
    pub consistency_score: u32,
    pub mentions: Vec<ThemeMention>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PacingAnalysis {
    /// `"{action + dialogue}/{description}"` as percentages.
    pub action_vs_dialogue_ratio: String,
    pub slow_scenes: Vec<String>,
    pub pacing_score: u32,
}

/// Full analysis of a story.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeDna {
    pub emotional_arc: EmotionalArc,
    pub character_development: CharacterDevelopment,
    pub theme_consistency: ThemeConsistency,
    pub pacing: PacingAnalysis,
    pub comparative_insights: Vec<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Analyze one branch.
pub fn analyze_branch(branch: &Branch) -> Result<NarrativeDna, AnalysisError> {
    analyze_narrative(&branch.scenes)
}

/// Analyze scenes given in reading order.
pub fn analyze_narrative(scenes: &[Scene]) -> Result<NarrativeDna, AnalysisError> {
    if scenes.is_empty() {
        return Err(AnalysisError::Empty);
    }

    let plain: Vec<String> = scenes.iter().map(Scene::plain_text).collect();
    let full_text = plain
        .iter()
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let words = full_text.split_whitespace().count();
    if words < MIN_ANALYSIS_WORDS {
        return Err(AnalysisError::TooShort { words });
    }

    let lowered: Vec<String> = plain.iter().map(|t| t.to_lowercase()).collect();
    let titled: Vec<(&str, &str)> = scenes
        .iter()
        .zip(&lowered)
        .map(|(scene, text)| (scene.title.as_str(), text.as_str()))
        .collect();

    tracing::debug!(scenes = scenes.len(), words, "Analyzing narrative");

    Ok(NarrativeDna {
        emotional_arc: emotional_arc(&titled),
        character_development: character_development(&full_text),
        theme_consistency: theme_consistency(&titled, &full_text, words),
        pacing: pacing(&titled, &full_text),
        comparative_insights: comparative_insights(&full_text, words, scenes.len()),
        analyzed_at: Utc::now(),
    })
}

fn hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|k| text::count_occurrences(text, k)).sum()
}

fn capped(n: usize, cap: u32) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX).min(cap)
}

fn emotional_arc(scenes: &[(&str, &str)]) -> EmotionalArc {
    let points: Vec<EmotionalPoint> = scenes
        .iter()
        .enumerate()
        .map(|(i, (title, text))| {
            let mut tension = 10 * hits(text, EMOTIONS[0].1);
            if TURNING_POINTS.iter().any(|w| text.contains(w)) {
                tension += 30;
            }
            EmotionalPoint {
                scene: i + 1,
                title: title.to_string(),
                tension: capped(tension, 100),
                dominant_emotion: dominant_emotion(text),
            }
        })
        .collect();

    let mut peak: Option<&EmotionalPoint> = None;
    for point in &points {
        if peak.map_or(true, |p| point.tension > p.tension) {
            peak = Some(point);
        }
    }
    let total: u32 = points.iter().map(|p| p.tension).sum();
    let tension_score = if points.is_empty() { 0 } else { total / points.len() as u32 };

    EmotionalArc {
        tension_score,
        peak_moment: peak.map(|p| p.title.clone()),
        points,
    }
}

fn dominant_emotion(text: &str) -> String {
    let mut best: Option<(&str, usize)> = None;
    for (emotion, keywords) in EMOTIONS {
        let count = hits(text, keywords);
        if count > 0 && best.map_or(true, |(_, top)| count > top) {
            best = Some((*emotion, count));
        }
    }
    best.map_or("neutral", |(emotion, _)| emotion).to_string()
}

fn sentences(text: &str) -> Vec<String> {
    SENTENCE_RE.split(text).map(str::to_lowercase).collect()
}

fn character_names(text: &str) -> Vec<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for m in NAME_RE.find_iter(text) {
        let word = m.as_str();
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter(|w| counts[w] >= 3 && w.len() > 2 && !COMMON_WORDS.contains(w))
        .take(MAX_CHARACTERS)
        .map(str::to_string)
        .collect()
}

fn character_development(full_text: &str) -> CharacterDevelopment {
    let characters = character_names(full_text);
    let lowered = full_text.to_lowercase();
    let sentences = sentences(full_text);
    let paired: Vec<String> = characters
        .iter()
        .take(MAX_PAIRED_CHARACTERS)
        .map(|c| c.to_lowercase())
        .collect();

    let mut relationships = Vec::new();
    for (i, first) in paired.iter().enumerate() {
        for (j, second) in paired.iter().enumerate().skip(i + 1) {
            let together = sentences
                .iter()
                .filter(|s| s.contains(first.as_str()) && s.contains(second.as_str()))
                .count();
            if together > 0 {
                relationships.push(Relationship {
                    first: characters[i].clone(),
                    second: characters[j].clone(),
                    strength: capped(together, 10),
                });
            }
        }
    }

    let arcs = paired
        .iter()
        .zip(&characters)
        .map(|(lower, name)| {
            let developing = sentences
                .iter()
                .filter(|s| s.contains(lower.as_str()) && ARC_WORDS.iter().any(|w| s.contains(w)))
                .count();
            CharacterArc {
                name: name.clone(),
                arc_strength: capped(developing, 10),
                mentions: text::count_occurrences(&lowered, lower),
            }
        })
        .collect();

    CharacterDevelopment {
        characters,
        protagonist_growth: capped(5 * hits(&lowered, GROWTH_WORDS), 100),
        relationships,
        arcs,
    }
}

fn theme_consistency(scenes: &[(&str, &str)], full_text: &str, words: usize) -> ThemeConsistency {
    let lowered = full_text.to_lowercase();
    let mut core: Option<(&str, &[&str], usize)> = None;
    for (theme, keywords) in THEMES {
        let count = hits(&lowered, keywords);
        if count > 0 && core.map_or(true, |(_, _, top)| count > top) {
            core = Some((*theme, *keywords, count));
        }
    }

    let Some((theme, keywords, strength)) = core else {
        return ThemeConsistency {
            core_theme: None,
            consistency_score: 0,
            mentions: Vec::new(),
        };
    };

    let mentions = scenes
        .iter()
        .enumerate()
        .filter_map(|(i, (title, text))| {
            let mentions = hits(text, keywords);
            (mentions > 0).then(|| ThemeMention {
                scene: i + 1,
                title: title.to_string(),
                mentions,
            })
        })
        .collect();

    ThemeConsistency {
        core_theme: Some(theme.to_string()),
        consistency_score: capped(strength * 1000 / words.max(1), 100),
        mentions,
    }
}

fn pacing(scenes: &[(&str, &str)], full_text: &str) -> PacingAnalysis {
    let lowered = full_text.to_lowercase();
    let action = hits(&lowered, ACTION_WORDS);
    let dialogue = full_text.matches(['"', '\'']).count();
    let description = hits(&lowered, DESCRIPTION_WORDS);
    let total = action + dialogue + description;

    let action_vs_dialogue_ratio = if total > 0 {
        let action_pct = action * 100 / total;
        let dialogue_pct = dialogue * 100 / total;
        let fast = action_pct + dialogue_pct;
        format!("{fast}/{}", 100 - fast)
    } else {
        "50/50".to_string()
    };

    let slow_scenes = scenes
        .iter()
        .enumerate()
        .filter(|(_, (_, text))| text.split_whitespace().count() > 100 && hits(text, ACTION_WORDS) == 0)
        .map(|(i, (title, _))| format!("Scene {}: {title}", i + 1))
        .collect();

    PacingAnalysis {
        action_vs_dialogue_ratio,
        slow_scenes,
        pacing_score: capped(action * 2 + dialogue / 2, 100).max(10),
    }
}

fn comparative_insights(full_text: &str, words: usize, scene_count: usize) -> Vec<String> {
    let lowered = full_text.to_lowercase();
    let mut insights = Vec::new();
    if scene_count >= 10 && lowered.contains("mystery") {
        insights.push("Many scenes building toward a reveal, in the manner of a classic whodunit".to_string());
    }
    if words > 5000 && lowered.contains("character") {
        insights.push("A large cast carrying the story, like an ensemble saga".to_string());
    }
    if lowered.contains("love") && lowered.contains("conflict") {
        insights.push("Romance under pressure, in the tradition of the comedy of manners".to_string());
    }
    if insights.is_empty() {
        insights.push("A structure of its own".to_string());
    }
    insights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filler(words: usize) -> String {
        vec!["lorem"; words].join(" ")
    }

    #[test]
    fn test_rejects_empty_and_short() {
        assert_eq!(analyze_narrative(&[]), Err(AnalysisError::Empty));
        let short = [Scene::new("a", "A").with_content("Too few words here.")];
        assert_eq!(analyze_narrative(&short), Err(AnalysisError::TooShort { words: 4 }));
    }

    #[test]
    fn test_emotional_arc() {
        let scenes = [
            Scene::new("s1", "Calm").with_content(format!("{} She laughed with joy.", filler(60))),
            Scene::new("s2", "Storm").with_content("Danger and fear at the climax."),
            Scene::new("s3", "After").with_content(filler(50)),
        ];
        let arc = analyze_narrative(&scenes).unwrap().emotional_arc;
        let tensions: Vec<u32> = arc.points.iter().map(|p| p.tension).collect();
        assert_eq!(tensions, vec![0, 50, 0]);
        assert_eq!(arc.points[0].dominant_emotion, "joy");
        assert_eq!(arc.points[1].dominant_emotion, "tension");
        assert_eq!(arc.points[2].dominant_emotion, "neutral");
        assert_eq!(arc.peak_moment.as_deref(), Some("Storm"));
        assert_eq!(arc.tension_score, 16);
    }

    #[test]
    fn test_character_development() {
        let text = format!(
            "Mara met Tobin. Mara met Tobin. Mara learned to sail. Tobin waited. \
             The sea. The sky. The end. Io sang. Io sang. Io sang. {}",
            filler(90)
        );
        let dev = analyze_narrative(&[Scene::new("s1", "Voyage").with_content(text)])
            .unwrap()
            .character_development;

        assert_eq!(dev.characters, vec!["Mara", "Tobin"]);
        assert_eq!(dev.protagonist_growth, 5);
        assert_eq!(
            dev.relationships,
            vec![Relationship {
                first: "Mara".into(),
                second: "Tobin".into(),
                strength: 2,
            }]
        );
        assert_eq!(dev.arcs[0].arc_strength, 1);
        assert_eq!(dev.arcs[0].mentions, 3);
        assert_eq!(dev.arcs[1].arc_strength, 0);
    }

    #[test]
    fn test_theme_consistency() {
        let scenes = [
            Scene::new("s1", "Cell").with_content(format!("They sought freedom. {}", filler(50))),
            Scene::new("s2", "Yard").with_content(filler(47)),
        ];
        let themes = analyze_narrative(&scenes).unwrap().theme_consistency;
        assert_eq!(themes.core_theme.as_deref(), Some("freedom"));
        // "freedom" also contains "free"
        assert_eq!(themes.consistency_score, 20);
        assert_eq!(
            themes.mentions,
            vec![ThemeMention {
                scene: 1,
                title: "Cell".into(),
                mentions: 2,
            }]
        );
    }

    #[test]
    fn test_pacing() {
        let scenes = [
            Scene::new("s1", "Fight").with_content("They fought and rushed on. \"Go,\" she said."),
            Scene::new("s2", "Quiet").with_content(filler(101)),
        ];
        let pacing = analyze_narrative(&scenes).unwrap().pacing;
        assert_eq!(pacing.action_vs_dialogue_ratio, "100/0");
        assert_eq!(pacing.slow_scenes, vec!["Scene 2: Quiet"]);
        assert_eq!(pacing.pacing_score, 10);
    }

    #[test]
    fn test_quick_insights() {
        let scenes = [
            Scene::new("a", "A").with_content("One two three."),
            Scene::new("b", "B").with_content("Four five."),
            Scene::new("c", "C")
                .with_content("Six.")
                .with_status(SceneStatus::Written),
        ];
        let insights = quick_insights(&scenes).unwrap();
        assert_eq!(insights.word_count, 6);
        assert_eq!(insights.average_words_per_scene, 2);
        assert_eq!(insights.status_distribution["draft"], 2);
        assert_eq!(insights.status_distribution["written"], 1);
        assert_eq!(insights.suggestions.len(), 2);

        let single = quick_insights(&scenes[..1]).unwrap();
        assert!(single.suggestions.iter().any(|s| s.contains("connecting")));
        assert_eq!(quick_insights(&[]), Err(AnalysisError::Empty));
    }
}
