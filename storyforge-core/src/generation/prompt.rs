//! Prompt text for scene generation.

use super::service::GenerationRequest;
use crate::narrative::NarrativeContext;
use crate::text;
use std::fmt::Write;

/// System prompt for the branching-story assistant.
pub const SYSTEM_PROMPT: &str = "You are a creative writing assistant specializing in story branching and narrative development.

Your role is to:
1. Analyze the given story context
2. Generate diverse, compelling continuations for the next scene
3. Give each option a distinct impact level and narrative direction
4. Write engaging prose that the author can build upon

Focus on:
- Narrative coherence with the existing story
- Character development opportunities
- Plot advancement potential
- Creative but believable story directions

Always respond with valid JSON in the requested format.";

/// Describe the slot a scene fills and everything that leads up to it.
pub fn compose_context_prompt(
    ctx: &NarrativeContext,
    scene_title: &str,
    genre: Option<&str>,
    tone: Option<&str>,
) -> String {
    let mut prompt = String::new();
    let number = ctx.position + 1;

    if ctx.is_first() {
        let _ = writeln!(
            prompt,
            "Write the opening scene (scene 1 of {}) of the story.",
            ctx.branch_length
        );
    } else {
        let _ = writeln!(
            prompt,
            "Write scene {number} of {} so that it continues directly from the story so far.",
            ctx.branch_length
        );
    }
    if !scene_title.trim().is_empty() {
        let _ = writeln!(prompt, "Working title: {}", scene_title.trim());
    }

    if ctx.has_history() {
        let _ = writeln!(prompt, "\nStory so far:\n{}", ctx.context_text);
    }

    if !ctx.established_elements.is_empty() {
        let _ = writeln!(prompt, "\nEstablished elements:");
        for (label, items) in ctx.established_elements.categories() {
            let _ = writeln!(prompt, "- {label}: {}", items.join("; "));
        }
    }

    if !ctx.character_names.is_empty() {
        let _ = writeln!(prompt, "\nCharacters: {}", ctx.character_names.join(", "));
    }
    if let Some(genre) = genre {
        let _ = writeln!(prompt, "Genre: {genre}");
    }
    if let Some(tone) = tone {
        let _ = writeln!(prompt, "Tone: {tone}");
    }

    prompt.trim_end().to_string()
}

/// The user message sent to Claude for one generation request.
pub fn branch_prompt(request: &GenerationRequest, option_count: usize, max_context_chars: usize) -> String {
    let context = text::tail_chars(&request.context_prompt, max_context_chars);

    let mut details = String::new();
    if !request.character_names.is_empty() {
        let _ = writeln!(details, "Main characters: {}", request.character_names.join(", "));
    }
    if let Some(genre) = &request.genre {
        let _ = writeln!(details, "Genre: {genre}");
    }
    if let Some(tone) = &request.tone {
        let _ = writeln!(details, "Tone: {tone}");
    }

    format!(
        r#"Generate {option_count} distinct options for the next scene of this narrative:

{context}

{details}
Create {option_count} different story directions with:
- Variety in impact level (high/medium/low)
- Different story elements and character focuses
- Compelling next steps that feel natural

Return as JSON with this exact structure:
{{
  "branches": [
    {{
      "title": "Scene title",
      "summary": "Brief description of what happens",
      "content": "The full scene text (100-150 words)",
      "characters": ["character1", "character2"],
      "impact": "high|medium|low",
      "tags": ["tag1", "tag2"]
    }}
  ]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BranchId;
    use crate::narrative::build_context;
    use crate::scene::Scene;

    fn scenes() -> Vec<Scene> {
        vec![
            Scene::new("s1", "Dock")
                .with_content("Mara waited at the pier for the ferry.")
                .with_character("Mara"),
            Scene::new("s2", "Crossing"),
        ]
    }

    #[test]
    fn test_opening_prompt() {
        let scenes = scenes();
        let ctx = build_context(&BranchId::from_path([&scenes[0].id]), &scenes[..1], 0);
        let prompt = compose_context_prompt(&ctx, "Dock", None, None);
        assert!(prompt.starts_with("Write the opening scene (scene 1 of 1)"));
        assert!(!prompt.contains("Story so far"));
        assert!(!prompt.contains("Characters:"));
    }

    #[test]
    fn test_continuation_prompt_carries_history() {
        let scenes = scenes();
        let id = BranchId::from_path(scenes.iter().map(|s| &s.id));
        let ctx = build_context(&id, &scenes, 1);
        let prompt = compose_context_prompt(&ctx, "Crossing", Some("adventure"), Some("hopeful"));
        assert!(prompt.contains("scene 2 of 2"));
        assert!(prompt.contains("Characters: Mara"));
        assert!(prompt.contains("Mara waited at the pier for the ferry."));
        assert!(prompt.contains("- Settings: pier for the"));
        assert!(prompt.contains("Genre: adventure"));
        assert!(prompt.contains("Tone: hopeful"));
    }

    #[test]
    fn test_branch_prompt_keeps_context_tail() {
        let request = GenerationRequest {
            context_prompt: format!("{}THE END", "x".repeat(100)),
            target_scene_id: "s9".into(),
            character_names: vec!["Mara".into()],
            genre: None,
            tone: Some("dark".into()),
        };
        let prompt = branch_prompt(&request, 3, 10);
        assert!(prompt.contains("xxxTHE END"));
        assert!(!prompt.contains("xxxxTHE END"));
        assert!(prompt.contains("Main characters: Mara"));
        assert!(prompt.contains("Tone: dark"));
        assert!(!prompt.contains("Genre:"));
        assert!(prompt.contains("\"branches\""));
    }
}
