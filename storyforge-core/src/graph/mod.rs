//! Story graph analysis: branch discovery, main-branch ranking and memoized structure.

pub mod analyzer;
pub mod branch;
pub mod cache;
pub mod ranker;

pub use analyzer::{analyze_structure, find_leaves, find_roots, traverse_branches, validate_snapshot};
pub use branch::{Branch, BranchId, StoryStructure, StructuralWarning, COMPLETE_MIN_WORDS};
pub use cache::{structural_hash, StructureCache};
pub use ranker::{score, select_main};
