//! Coherence scoring of generated candidates against their narrative context.

use super::service::{Candidate, GenerationError};
use crate::narrative::NarrativeContext;
use crate::text;

const CHARACTER_WEIGHT: i64 = 10;
const SETTING_WEIGHT: i64 = 5;
const PROGRESSION_WEIGHT: i64 = 3;

const PROGRESSION_WORDS: &[&str] = &["then", "next", "after", "following", "suddenly", "meanwhile"];

/// Coherence score of one candidate.
pub fn score_candidate(candidate: &Candidate, ctx: &NarrativeContext) -> i64 {
    let content = text::plain_text(&candidate.content).to_lowercase();

    let characters = ctx
        .character_names
        .iter()
        .filter(|name| content.contains(&name.to_lowercase()))
        .count() as i64;

    let settings = ctx
        .established_elements
        .settings
        .iter()
        .filter(|phrase| content.contains(phrase.as_str()))
        .count() as i64;

    let progression = text::words(&content)
        .iter()
        .filter(|w| PROGRESSION_WORDS.contains(&w.norm.as_str()))
        .count() as i64;

    CHARACTER_WEIGHT * characters + SETTING_WEIGHT * settings + PROGRESSION_WEIGHT * progression
}

/// The highest-scoring candidate; ties keep list order.
pub fn select_best<'a>(options: &'a [Candidate], ctx: &NarrativeContext) -> Result<&'a Candidate, GenerationError> {
    let mut best: Option<(&Candidate, i64)> = None;
    for candidate in options {
        let score = score_candidate(candidate, ctx);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }
    best.map(|(candidate, _)| candidate)
        .ok_or(GenerationError::NoCandidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BranchId;
    use crate::narrative::build_context;
    use crate::scene::Scene;

    fn context() -> NarrativeContext {
        let scenes = vec![
            Scene::new("s1", "Harbor")
                .with_content("Mara slept in the lighthouse keeper's loft.")
                .with_character("Mara")
                .with_character("Tobin"),
            Scene::new("s2", "Next"),
        ];
        let id = BranchId::from_path(scenes.iter().map(|s| &s.id));
        build_context(&id, &scenes, 1)
    }

    #[test]
    fn test_score_components() {
        let ctx = context();
        assert_eq!(ctx.established_elements.settings, vec!["lighthouse keeper's loft"]);

        let candidate = Candidate::new(
            "c",
            "Morning",
            "Then MARA climbed down from the lighthouse keeper's loft. Suddenly, Tobin called.",
        );
        // two characters, one setting, two progression words
        assert_eq!(score_candidate(&candidate, &ctx), 20 + 5 + 6);
    }

    #[test]
    fn test_select_best_prefers_coherence() {
        let ctx = context();
        let options = vec![
            Candidate::new("a", "Elsewhere", "A stranger walked the desert."),
            Candidate::new("b", "Back home", "Mara woke. Then Tobin knocked."),
            Candidate::new("c", "Alone", "Mara woke."),
        ];
        assert_eq!(select_best(&options, &ctx).unwrap().id, "b");
    }

    #[test]
    fn test_ties_keep_list_order() {
        let ctx = context();
        let options = vec![
            Candidate::new("a", "One", "Rain."),
            Candidate::new("b", "Two", "Snow."),
        ];
        assert_eq!(select_best(&options, &ctx).unwrap().id, "a");
    }

    #[test]
    fn test_empty_options() {
        let ctx = context();
        assert!(matches!(select_best(&[], &ctx), Err(GenerationError::NoCandidates)));
    }
}
