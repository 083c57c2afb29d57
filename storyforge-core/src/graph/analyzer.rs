//! Branch discovery over the scene graph.
//!
//! Roots are visited in snapshot order and connections in their stored
//! order, so the discovery order of branches is fully determined by the
//! input. Duplicate scene ids resolve to the first occurrence.
//!
//! A scene with neither incoming nor outgoing connections does not start a
//! story branch; it is reported as an orphan. The exception is a snapshot
//! with no connections at all, where every scene stands as its own branch.

use super::branch::{Branch, StoryStructure, StructuralWarning};
use super::ranker;
use crate::error::InputError;
use crate::scene::{Scene, SceneId};
use std::collections::{HashMap, HashSet};

/// Reject snapshots the engine cannot process faithfully.
pub fn validate_snapshot(scenes: &[Scene]) -> Result<(), InputError> {
    let mut seen = HashSet::with_capacity(scenes.len());
    for scene in scenes {
        if !seen.insert(scene.id.as_str()) {
            return Err(InputError::DuplicateSceneId(scene.id.clone()));
        }
    }
    Ok(())
}

/// Scenes that no connection points at.
pub fn find_roots(scenes: &[Scene]) -> Vec<&Scene> {
    let graph = SceneGraph::new(scenes);
    graph.roots().into_iter().map(|i| graph.scenes[i]).collect()
}

/// Scenes without outgoing connections.
pub fn find_leaves(scenes: &[Scene]) -> Vec<&Scene> {
    SceneGraph::new(scenes)
        .scenes
        .into_iter()
        .filter(|s| s.connections.is_empty())
        .collect()
}

/// Enumerate every branch that starts at `root`.
///
/// Cycles and dangling connections close the branch at the scene where they
/// occur instead of failing.
pub fn traverse_branches<'a>(root: &'a Scene, scenes: &'a [Scene]) -> Vec<Branch> {
    let mut graph = SceneGraph::new(scenes);
    let root_idx = match graph.position(root.id.as_str()) {
        Some(idx) => idx,
        None => graph.push(root),
    };
    let walk = graph.walk(root_idx);
    walk.paths.iter().map(|path| graph.branch(path)).collect()
}

/// Derive the full story structure of a snapshot.
pub fn analyze_structure(scenes: &[Scene]) -> StoryStructure {
    let graph = SceneGraph::new(scenes);
    if graph.scenes.is_empty() {
        return StoryStructure::empty();
    }

    let mut paths = Vec::new();
    let mut warnings = Vec::new();
    for root in graph.story_roots() {
        let walk = graph.walk(root);
        paths.extend(walk.paths);
        for warning in walk.warnings {
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
    }

    let covered: HashSet<usize> = paths.iter().flatten().copied().collect();
    let orphaned_scenes: Vec<Scene> = graph
        .scenes
        .iter()
        .enumerate()
        .filter(|(idx, _)| !covered.contains(idx))
        .map(|(_, scene)| (*scene).clone())
        .collect();
    warnings.extend(orphaned_scenes.iter().map(|s| StructuralWarning::Orphan {
        scene: s.id.clone(),
    }));

    let mut branches: Vec<Branch> = paths.iter().map(|path| graph.branch(path)).collect();
    link_branch_points(&mut branches, &paths);

    let total_branches = branches.len();
    let main_branch = match ranker::select_main(&branches) {
        Some(idx) => branches.remove(idx),
        None => Branch::empty(),
    };
    let is_linear = total_branches <= 1 && orphaned_scenes.is_empty();

    tracing::debug!(
        branches = total_branches,
        orphans = orphaned_scenes.len(),
        warnings = warnings.len(),
        main = %main_branch.id,
        "Analyzed story structure"
    );

    StoryStructure {
        main_branch,
        alternate_branches: branches,
        orphaned_scenes,
        total_branches,
        is_linear,
        warnings,
    }
}

/// Record, for every branch, where it forks off the earlier branch it shares the longest prefix with.
fn link_branch_points(branches: &mut [Branch], paths: &[Vec<usize>]) {
    for i in 1..paths.len() {
        let best = (0..i)
            .map(|j| (j, common_prefix(&paths[i], &paths[j])))
            .filter(|(_, shared)| *shared > 0)
            .fold(None::<(usize, usize)>, |best, candidate| match best {
                Some((_, shared)) if shared >= candidate.1 => best,
                _ => Some(candidate),
            });

        if let Some((j, shared)) = best {
            let parent = branches[j].id.clone();
            let branch = &mut branches[i];
            branch.branch_point = Some(branch.scenes[shared - 1].id.clone());
            branch.parent = Some(parent);
        }
    }
}

fn common_prefix(a: &[usize], b: &[usize]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Deduplicated view of a snapshot with an id index.
struct SceneGraph<'a> {
    scenes: Vec<&'a Scene>,
    index: HashMap<&'a str, usize>,
}

struct Walk {
    paths: Vec<Vec<usize>>,
    warnings: Vec<StructuralWarning>,
}

struct Frame {
    scene: usize,
    next: usize,
}

impl<'a> SceneGraph<'a> {
    fn new(scenes: &'a [Scene]) -> Self {
        let mut graph = Self {
            scenes: Vec::with_capacity(scenes.len()),
            index: HashMap::with_capacity(scenes.len()),
        };
        for scene in scenes {
            if !graph.index.contains_key(scene.id.as_str()) {
                graph.push(scene);
            }
        }
        graph
    }

    fn push(&mut self, scene: &'a Scene) -> usize {
        let idx = self.scenes.len();
        self.index.insert(scene.id.as_str(), idx);
        self.scenes.push(scene);
        idx
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn roots(&self) -> Vec<usize> {
        let targets: HashSet<&SceneId> = self
            .scenes
            .iter()
            .flat_map(|s| s.connections.iter())
            .collect();
        (0..self.scenes.len())
            .filter(|&i| !targets.contains(&self.scenes[i].id))
            .collect()
    }

    /// Roots that start story branches: isolated scenes only count when the
    /// snapshot has no connections at all.
    fn story_roots(&self) -> Vec<usize> {
        let has_edges = self.scenes.iter().any(|s| !s.connections.is_empty());
        self.roots()
            .into_iter()
            .filter(|&i| !has_edges || !self.scenes[i].connections.is_empty())
            .collect()
    }

    fn branch(&self, path: &[usize]) -> Branch {
        Branch::from_scenes(path.iter().map(|&i| self.scenes[i].clone()).collect())
    }

    /// Depth-first walk with an explicit stack. `on_path` holds exactly the
    /// scenes of the current stack, so sibling branches never look cyclic.
    fn walk(&self, root: usize) -> Walk {
        let mut paths: Vec<Vec<usize>> = Vec::new();
        let mut emitted: HashSet<Vec<usize>> = HashSet::new();
        let mut warnings = Vec::new();

        let mut stack = vec![Frame {
            scene: root,
            next: 0,
        }];
        let mut on_path: HashSet<usize> = HashSet::from([root]);

        let mut close = |stack: &[Frame], paths: &mut Vec<Vec<usize>>| {
            let path: Vec<usize> = stack.iter().map(|f| f.scene).collect();
            if emitted.insert(path.clone()) {
                paths.push(path);
            }
        };

        while let Some(frame) = stack.last_mut() {
            let current = frame.scene;
            let next = frame.next;
            frame.next += 1;
            let scene = self.scenes[current];

            let Some(target) = scene.connections.get(next) else {
                if next == 0 {
                    close(&stack, &mut paths);
                }
                stack.pop();
                on_path.remove(&current);
                continue;
            };

            match self.index.get(target.as_str()) {
                None => {
                    warnings.push(StructuralWarning::DanglingConnection {
                        from: scene.id.clone(),
                        to: target.clone(),
                    });
                    close(&stack, &mut paths);
                }
                Some(&t) if on_path.contains(&t) => {
                    warnings.push(StructuralWarning::Cycle {
                        at: scene.id.clone(),
                        target: target.clone(),
                    });
                    close(&stack, &mut paths);
                }
                Some(&t) => {
                    on_path.insert(t);
                    stack.push(Frame { scene: t, next: 0 });
                }
            }
        }

        Walk { paths, warnings }
    }
}
