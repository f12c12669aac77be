//! Conflict parsing, version extraction, and per-file resolution strategies.
//!
//! The conflict subsystem is responsible for:
//! 1. **Parsing** -- locating conflict hunks in a file, in order.
//! 2. **Extraction** -- recognising dependency declarations and their versions.
//! 3. **Merging** -- keeping the highest version for every conflicting line.
//! 4. **Dispatch** -- deciding per file whether to merge, regenerate, or defer.

mod markup;
pub mod merger;
pub mod parser;
pub mod strategy;
pub mod version;

pub use merger::{HunkMerger, MergeOutcome, ResolvedLine, Side, UnresolvedReason};
pub use parser::{parse_hunks, ConflictHunk, FileText};
pub use strategy::{processing_order, Strategy, StrategySelector};
pub use version::{extract_version, PackageVersion, VersionToken};
