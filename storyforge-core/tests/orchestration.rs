//! Generation passes driven by the mock generator.
//!
//! Run with: `cargo test -p storyforge-core --test orchestration`

use std::sync::Arc;
use std::time::Duration;
use storyforge_core::generation::Candidate;
use storyforge_core::testing::{linear_story, written, MockGenerator};
use storyforge_core::{
    CachingGenerator, ConnectionChange, EngineConfig, InputError, Orchestrator, PassOutcome, Scene, SceneId,
    SceneStatus,
};

fn scene<'a>(outcome: &'a PassOutcome, id: &str) -> &'a Scene {
    outcome
        .updated_scenes
        .iter()
        .find(|s| s.id.as_str() == id)
        .expect("scene in outcome")
}

// =============================================================================
// Failures and placeholders
// =============================================================================

#[tokio::test]
async fn test_failed_scene_becomes_placeholder_and_pass_continues() {
    let scenes = linear_story(5);
    let mock = Arc::new(MockGenerator::new().fail_on("s3"));
    let orchestrator = Orchestrator::new(mock.clone());

    let outcome = orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    let s3 = scene(&outcome, "s3");
    assert_eq!(s3.status, SceneStatus::Draft);
    assert!(s3.content.contains("Continuation scene 3 of 5"));

    for id in ["s1", "s2", "s4", "s5"] {
        assert_eq!(scene(&outcome, id).status, SceneStatus::Written, "{id}");
    }

    // Downstream scenes see the placeholder as upstream context.
    let s4_requests = mock.requests_for("s4").await;
    assert_eq!(s4_requests.len(), 1);
    assert!(s4_requests[0].context_prompt.contains("Continuation scene 3 of 5"));
    let s5_requests = mock.requests_for("s5").await;
    assert!(s5_requests[0].context_prompt.contains("Continuation scene 3 of 5"));

    let story = &outcome.generated_stories[0];
    assert_eq!(story.metadata.scene_count, 5);
    assert_eq!(story.metadata.generated_scenes, 4);
    assert_eq!(story.metadata.placeholder_scenes, 1);

    assert_eq!(outcome.insights.placeholder_scenes, 1);
    assert_eq!(outcome.insights.failures.len(), 1);
    assert_eq!(outcome.insights.failures[0].scene_id, SceneId::from("s3"));
}

#[tokio::test]
async fn test_empty_candidates_become_placeholder() {
    let scenes = linear_story(2);
    let mock = Arc::new(MockGenerator::new().empty_on("s1"));
    let orchestrator = Orchestrator::new(mock);

    let outcome = orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    let s1 = scene(&outcome, "s1");
    assert!(s1.content.contains("first scene"));
    assert_eq!(s1.status, SceneStatus::Draft);
    assert!(outcome.insights.failures[0].reason.contains("no candidates"));
}

#[tokio::test]
async fn test_slow_generation_times_out() {
    let scenes = linear_story(3);
    let mock = Arc::new(MockGenerator::new().delay_on("s2", Duration::from_millis(500)));
    let config = EngineConfig::default().with_generation_timeout(Duration::from_millis(20));
    let orchestrator = Orchestrator::new(mock).with_config(config);

    let outcome = orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    assert_eq!(outcome.insights.failures.len(), 1);
    assert_eq!(outcome.insights.failures[0].scene_id, SceneId::from("s2"));
    assert!(outcome.insights.failures[0].reason.contains("timed out"));
    assert_eq!(scene(&outcome, "s3").status, SceneStatus::Written);
}

// =============================================================================
// Selection and affected scenes
// =============================================================================

#[tokio::test]
async fn test_best_candidate_is_chosen() {
    let scenes = vec![
        written(Scene::new("s1", "Start").with_character("Mara"), "Mara stood in the hall.")
            .with_connection("s2"),
        Scene::new("s2", ""),
    ];
    let mock = Arc::new(MockGenerator::new().with_script(
        "s2",
        vec![
            Candidate::new("c1", "Elsewhere", "A stranger walked away."),
            Candidate::new("c2", "Mara returns", "Then Mara climbed the stairs."),
        ],
    ));
    let orchestrator = Orchestrator::new(mock);

    let outcome = orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    let s2 = scene(&outcome, "s2");
    assert_eq!(s2.content, "Then Mara climbed the stairs.");
    assert_eq!(s2.title, "Mara returns");
}

#[tokio::test]
async fn test_removed_connection_keeps_written_scenes() {
    // s2 -> s3 was just removed; s3 is now an orphan.
    let scenes: Vec<Scene> = vec![
        written(Scene::new("s1", "One"), "First.").with_connection("s2"),
        written(Scene::new("s2", "Two"), "Second."),
        written(Scene::new("s3", "Three"), "Third."),
    ];
    let mock = Arc::new(MockGenerator::new());
    let orchestrator = Orchestrator::new(mock.clone());

    let outcome = orchestrator
        .process_structure_change(&scenes, &[ConnectionChange::removed("s2", "s3")])
        .await
        .unwrap();

    assert_eq!(mock.calls().await, 0);
    assert!(outcome.changed_scene_ids.is_empty());
    assert_eq!(outcome.insights.connections_removed, 1);
    assert_eq!(outcome.insights.orphaned_scenes, 1);
}

#[tokio::test]
async fn test_shared_scene_is_generated_once() {
    // s1 forks into s2 and s3; every scene is a draft.
    let scenes = vec![
        Scene::new("s1", "Start").with_connections(["s2", "s3"]),
        Scene::new("s2", "Left"),
        Scene::new("s3", "Right"),
    ];
    let mock = Arc::new(MockGenerator::new());
    let orchestrator = Orchestrator::new(mock.clone());

    let outcome = orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    assert_eq!(mock.requests_for("s1").await.len(), 1);
    assert_eq!(mock.calls().await, 3);
    assert_eq!(outcome.generated_stories.len(), 2);
    assert!(outcome.generated_stories[0].metadata.is_main);
    assert!(!outcome.generated_stories[1].metadata.is_main);

    let opening = MockGenerator::generated_text("s1");
    for story in &outcome.generated_stories {
        assert!(story.full_text.contains(&opening));
    }
}

#[tokio::test]
async fn test_merge_after_new_connection_is_regenerated() {
    // a forks into b and c, both rejoin at d. a -> c was just added.
    let scenes = vec![
        written(Scene::new("a", "A"), "Opening.").with_connections(["b", "c"]),
        written(Scene::new("b", "B"), "Left path.").with_connection("d"),
        written(Scene::new("c", "C"), "Right path.").with_connection("d"),
        written(Scene::new("d", "D"), "Both paths meet."),
    ];
    let mock = Arc::new(MockGenerator::new());
    let orchestrator = Orchestrator::new(mock.clone());

    let outcome = orchestrator
        .process_structure_change(&scenes, &[ConnectionChange::added("a", "c")])
        .await
        .unwrap();

    assert!(mock.requests_for("a").await.is_empty());
    assert!(mock.requests_for("b").await.is_empty());
    assert_eq!(mock.requests_for("c").await.len(), 1);
    assert_eq!(mock.requests_for("d").await.len(), 1);
    assert_eq!(mock.calls().await, 2);

    assert_eq!(scene(&outcome, "b").content, "Left path.");
    assert_eq!(scene(&outcome, "d").content, MockGenerator::generated_text("d"));
    assert!(outcome.changed_scene_ids.contains(&SceneId::from("d")));
}

#[tokio::test]
async fn test_duplicate_ids_rejected() {
    let scenes = vec![Scene::new("a", "A"), Scene::new("b", "B"), Scene::new("a", "A2")];
    let orchestrator = Orchestrator::new(Arc::new(MockGenerator::new()));

    let err = orchestrator.process_structure_change(&scenes, &[]).await.unwrap_err();
    assert_eq!(err, InputError::DuplicateSceneId(SceneId::from("a")));
}

// =============================================================================
// Concurrency and caching
// =============================================================================

fn two_independent_chains() -> Vec<Scene> {
    vec![
        Scene::new("a1", "A1").with_connection("a2"),
        Scene::new("a2", "A2"),
        Scene::new("b1", "B1").with_connection("b2"),
        Scene::new("b2", "B2"),
    ]
}

#[tokio::test]
async fn test_independent_branches_run_concurrently_with_same_result() {
    let scenes = two_independent_chains();

    let sequential_mock = Arc::new(MockGenerator::new().with_delay(Duration::from_millis(30)));
    let sequential = Orchestrator::new(sequential_mock.clone())
        .process_structure_change(&scenes, &[])
        .await
        .unwrap();

    let parallel_mock = Arc::new(MockGenerator::new().with_delay(Duration::from_millis(30)));
    let parallel = Orchestrator::new(parallel_mock.clone())
        .with_config(EngineConfig::default().with_max_concurrent_branches(2))
        .process_structure_change(&scenes, &[])
        .await
        .unwrap();

    assert_eq!(sequential_mock.max_in_flight(), 1);
    assert_eq!(parallel_mock.max_in_flight(), 2);

    let bodies = |o: &PassOutcome| -> Vec<(SceneId, String, SceneStatus)> {
        o.updated_scenes
            .iter()
            .map(|s| (s.id.clone(), s.content.clone(), s.status))
            .collect()
    };
    let stories = |o: &PassOutcome| -> Vec<(String, String)> {
        o.generated_stories
            .iter()
            .map(|s| (s.branch_id.to_string(), s.full_text.clone()))
            .collect()
    };
    assert_eq!(bodies(&sequential), bodies(&parallel));
    assert_eq!(sequential.changed_scene_ids, parallel.changed_scene_ids);
    assert_eq!(stories(&sequential), stories(&parallel));
}

#[tokio::test]
async fn test_cached_generator_skips_repeat_requests() {
    let scenes = two_independent_chains();
    let mock = Arc::new(MockGenerator::new());
    let cache = Arc::new(CachingGenerator::new(mock.clone(), Duration::from_secs(60), 16));
    let orchestrator = Orchestrator::new(cache.clone());

    orchestrator.process_structure_change(&scenes, &[]).await.unwrap();
    let first_calls = mock.calls().await;
    orchestrator.process_structure_change(&scenes, &[]).await.unwrap();

    assert_eq!(first_calls, 4);
    assert_eq!(mock.calls().await, first_calls);
    assert!(cache.len().await > 0);
}
