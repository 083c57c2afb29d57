//! Structure derivation over whole snapshots.
//!
//! Run with: `cargo test -p storyforge-core --test graph_analysis`

use storyforge_core::graph::{traverse_branches, StructureCache};
use storyforge_core::narrative::build_context_for;
use storyforge_core::{analyze_structure, Branch, Scene, SceneId, SceneStatus, StructuralWarning};

fn scene(id: &str, connections: &[&str]) -> Scene {
    Scene::new(id, format!("Scene {id}")).with_connections(connections.iter().copied())
}

fn ids(branch: &Branch) -> Vec<&str> {
    branch.scene_ids().map(SceneId::as_str).collect()
}

fn all_branches(scenes: &[Scene]) -> Vec<Vec<String>> {
    let structure = analyze_structure(scenes);
    let mut out: Vec<Vec<String>> = structure
        .branches()
        .map(|b| b.scene_ids().map(|id| id.to_string()).collect())
        .collect();
    out.sort();
    out
}

fn long_text(words: usize) -> String {
    vec!["word"; words].join(" ")
}

// =============================================================================
// Branch enumeration
// =============================================================================

#[test]
fn test_branch_count_matches_root_to_leaf_paths() {
    // r -> a -> c, r -> b -> c, c -> d, c -> e, plus a second root q -> e
    let scenes = vec![
        scene("r", &["a", "b"]),
        scene("a", &["c"]),
        scene("b", &["c"]),
        scene("c", &["d", "e"]),
        scene("d", &[]),
        scene("e", &[]),
        scene("q", &["e"]),
    ];

    let structure = analyze_structure(&scenes);
    assert_eq!(structure.total_branches, 5);
    assert!(!structure.is_linear);
    assert!(structure.orphaned_scenes.is_empty());

    let branches = all_branches(&scenes);
    assert!(branches.contains(&vec!["r".into(), "a".into(), "c".into(), "d".into()]));
    assert!(branches.contains(&vec!["r".into(), "b".into(), "c".into(), "e".into()]));
    assert!(branches.contains(&vec!["q".into(), "e".into()]));
}

#[test]
fn test_two_scene_cycle_terminates() {
    let scenes = vec![scene("a", &["b"]), scene("b", &["a"])];
    let branches = traverse_branches(&scenes[0], &scenes);

    assert!(!branches.is_empty());
    assert_eq!(ids(&branches[0]), vec!["a", "b"]);
}

#[test]
fn test_cycle_below_root_is_truncated_with_warning() {
    let scenes = vec![scene("s1", &["s2"]), scene("s2", &["s3"]), scene("s3", &["s2"])];
    let structure = analyze_structure(&scenes);

    assert_eq!(structure.total_branches, 1);
    assert_eq!(ids(&structure.main_branch), vec!["s1", "s2", "s3"]);
    assert!(structure.warnings.contains(&StructuralWarning::Cycle {
        at: "s3".into(),
        target: "s2".into(),
    }));
}

#[test]
fn test_dangling_connection_truncates_branch() {
    let scenes = vec![scene("s1", &["s2"]), scene("s2", &["ghost"])];
    let structure = analyze_structure(&scenes);

    assert_eq!(ids(&structure.main_branch), vec!["s1", "s2"]);
    assert!(structure.warnings.contains(&StructuralWarning::DanglingConnection {
        from: "s2".into(),
        to: "ghost".into(),
    }));
}

#[test]
fn test_isolated_scene_is_orphan() {
    let scenes = vec![scene("x", &[]), scene("a", &["b"]), scene("b", &[])];
    let structure = analyze_structure(&scenes);

    let orphans: Vec<&str> = structure.orphaned_scenes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(orphans, vec!["x"]);
    assert_eq!(structure.total_branches, 1);
    assert_eq!(ids(&structure.main_branch), vec!["a", "b"]);
    assert!(!structure.is_linear);
}

#[test]
fn test_fork_gives_two_branches_and_stable_main() {
    let scenes = vec![scene("s1", &["s2", "s3"]), scene("s2", &[]), scene("s3", &[])];

    let first = analyze_structure(&scenes);
    let second = analyze_structure(&scenes);

    assert_eq!(first.total_branches, 2);
    assert_eq!(all_branches(&scenes), vec![vec!["s1", "s2"], vec!["s1", "s3"]]);
    assert_eq!(first.main_branch.id, second.main_branch.id);
    assert_eq!(ids(&first.main_branch), vec!["s1", "s2"]);

    let alternate = &first.alternate_branches[0];
    assert_eq!(alternate.branch_point, Some(SceneId::from("s1")));
    assert_eq!(alternate.parent, Some(first.main_branch.id.clone()));
}

// =============================================================================
// Ranking
// =============================================================================

#[test]
fn test_complete_branch_wins_regardless_of_order() {
    for order in [["done", "draft"], ["draft", "done"]] {
        let scenes = vec![
            scene("root", &order),
            Scene::new("done", "Done")
                .with_content(long_text(120))
                .with_status(SceneStatus::Written),
            Scene::new("draft", "Draft"),
        ];
        let structure = analyze_structure(&scenes);
        assert!(structure.main_branch.is_complete);
        assert_eq!(ids(&structure.main_branch), vec!["root", "done"]);
    }
}

// =============================================================================
// Context lookup and memoization
// =============================================================================

#[test]
fn test_context_for_scene_in_snapshot() {
    let scenes = vec![
        scene("s1", &["s2"]).with_content("Mara waited in the garden."),
        scene("s2", &["s3"]).with_content("The letter arrived."),
        scene("s3", &[]),
    ];

    let ctx = build_context_for("s3", &scenes).unwrap();
    assert_eq!(ctx.position, 2);
    assert_eq!(ctx.branch_length, 3);
    assert_eq!(ctx.predecessors.len(), 2);
    assert!(ctx.context_text.contains("The letter arrived."));

    assert!(build_context_for("nowhere", &scenes).is_err());
}

#[test]
fn test_structure_cache_ignores_timestamps() {
    let scenes = vec![scene("s1", &["s2"]), scene("s2", &[])];
    let mut touched = scenes.clone();
    touched[1].updated_at = touched[1].updated_at + chrono::Duration::seconds(30);

    let mut cache = StructureCache::new();
    let a = cache.get_or_analyze(&scenes);
    let b = cache.get_or_analyze(&touched);
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(cache.hits(), 1);

    touched[0].disconnect("s2");
    let c = cache.get_or_analyze(&touched);
    assert!(!std::sync::Arc::ptr_eq(&a, &c));
    assert_eq!(cache.misses(), 2);
}
