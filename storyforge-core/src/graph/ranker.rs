//! Main-branch selection.

use super::branch::Branch;

const SCENE_WEIGHT: f64 = 10.0;
const WORD_WEIGHT: f64 = 0.1;
const COMPLETE_BONUS: f64 = 50.0;
const WRITTEN_SCENE_WEIGHT: f64 = 15.0;

/// Score a branch for main-branch selection.
pub fn score(branch: &Branch) -> f64 {
    let complete = if branch.is_complete { COMPLETE_BONUS } else { 0.0 };
    SCENE_WEIGHT * branch.len() as f64
        + WORD_WEIGHT * branch.word_count as f64
        + complete
        + WRITTEN_SCENE_WEIGHT * branch.written_count() as f64
}

/// Index of the highest-scoring branch; ties go to the earliest branch.
pub fn select_main(branches: &[Branch]) -> Option<usize> {
    match branches.len() {
        0 => None,
        1 => Some(0),
        _ => {
            let mut best = 0;
            let mut best_score = score(&branches[0]);
            for (idx, branch) in branches.iter().enumerate().skip(1) {
                let s = score(branch);
                if s > best_score {
                    best = idx;
                    best_score = s;
                }
            }
            Some(best)
        }
    }
}
