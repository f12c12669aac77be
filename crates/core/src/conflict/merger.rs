//! Version-aware hunk merging.
//!
//! Each conflict hunk is resolved line by line: the N-th "theirs" line is
//! paired with the N-th "ours" line, both must be dependency declarations,
//! and the line with the higher version is kept verbatim. Ties keep ours.
//! Any hunk that cannot be fully decided leaves the whole file untouched.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use super::parser::{parse_hunks, ConflictHunk, FileText};
use super::version::extract_version;
use crate::errors::ConflictError;

/// Which side of a hunk a resolved line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Theirs,
    Ours,
}

/// The line chosen for one theirs/ours pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLine<'a> {
    pub text: &'a str,
    pub side: Side,
}

/// Why a file could not be merged automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// Conflict markers of a hunk were missing or out of order.
    MalformedMarkers { hunk: usize },
    /// The two sides of a hunk have different line counts.
    ArityMismatch { hunk: usize, theirs: usize, ours: usize },
    /// Both sides of a hunk are empty.
    EmptyHunk { hunk: usize },
    /// A line pair did not both parse as version declarations.
    Unparseable { hunk: usize, line: usize },
}

impl fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedMarkers { hunk } => write!(f, "conflict markers of hunk {} are malformed", hunk + 1),
            Self::ArityMismatch { hunk, theirs, ours } => write!(
                f,
                "hunk {} has {} line(s) on theirs and {} on ours",
                hunk + 1,
                theirs,
                ours
            ),
            Self::EmptyHunk { hunk } => write!(f, "hunk {} is empty on both sides", hunk + 1),
            Self::Unparseable { hunk, line } => write!(
                f,
                "line {} of hunk {} is not a comparable version declaration",
                line + 1,
                hunk + 1
            ),
        }
    }
}

/// The result of merging one file's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Every hunk was resolved; `content` has no conflict markers left.
    Merged { content: String, hunks: usize },
    /// At least one hunk could not be decided.
    Unresolved(UnresolvedReason),
}

impl MergeOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }
}

/// Pick the line with the higher version; ours wins ties.
///
/// Returns `None` unless both lines are version declarations.
pub fn resolve_pair<'a>(theirs: &'a str, ours: &'a str) -> Option<ResolvedLine<'a>> {
    let their_token = extract_version(theirs)?;
    let our_token = extract_version(ours)?;

    let resolved = if their_token.version > our_token.version {
        ResolvedLine { text: theirs, side: Side::Theirs }
    } else {
        ResolvedLine { text: ours, side: Side::Ours }
    };
    debug!(
        theirs = %their_token.version,
        ours = %our_token.version,
        side = ?resolved.side,
        "resolved line pair"
    );
    Some(resolved)
}

/// Resolve one hunk's line arrays into the lines that replace it, in order.
///
/// `hunk` is only used to label the failure reason.
pub fn resolve_hunk<'a, S: AsRef<str>>(
    hunk: usize,
    theirs: &'a [S],
    ours: &'a [S],
) -> Result<Vec<ResolvedLine<'a>>, UnresolvedReason> {
    if theirs.len() != ours.len() {
        return Err(UnresolvedReason::ArityMismatch {
            hunk,
            theirs: theirs.len(),
            ours: ours.len(),
        });
    }
    if theirs.is_empty() {
        return Err(UnresolvedReason::EmptyHunk { hunk });
    }

    theirs
        .iter()
        .zip(ours)
        .enumerate()
        .map(|(line, (t, o))| {
            resolve_pair(t.as_ref(), o.as_ref())
                .ok_or(UnresolvedReason::Unparseable { hunk, line })
        })
        .collect()
}

/// Stateless merge engine for conflicted dependency files.
pub struct HunkMerger;

impl HunkMerger {
    /// Merge conflicted `content`. Content without markers merges to itself.
    pub fn merge(content: &str) -> MergeOutcome {
        let text = FileText::parse(content);

        let hunks = match parse_hunks(&text.lines) {
            Ok(hunks) => hunks,
            Err(malformed) => {
                return MergeOutcome::Unresolved(UnresolvedReason::MalformedMarkers {
                    hunk: malformed.index,
                })
            }
        };
        if hunks.is_empty() {
            return MergeOutcome::Merged {
                content: content.to_string(),
                hunks: 0,
            };
        }

        match merge_lines(&text.lines, &hunks) {
            Ok(merged) => MergeOutcome::Merged {
                content: text.render(merged),
                hunks: hunks.len(),
            },
            Err(reason) => MergeOutcome::Unresolved(reason),
        }
    }

    /// Merge the file at `path` in place.
    ///
    /// The file is rewritten only when every hunk resolved and there was at
    /// least one hunk; otherwise it is left byte-for-byte as it was.
    pub fn resolve_file(path: &Path) -> Result<MergeOutcome, ConflictError> {
        let shown = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| ConflictError::ReadFailed {
            path: shown.clone(),
            source,
        })?;

        let outcome = Self::merge(&content);
        match &outcome {
            MergeOutcome::Merged { content: merged, hunks } if *hunks > 0 => {
                std::fs::write(path, merged).map_err(|source| ConflictError::WriteFailed {
                    path: shown.clone(),
                    source,
                })?;
                info!(path = %shown, hunks, "merged conflicted file");
            }
            MergeOutcome::Merged { .. } => {
                debug!(path = %shown, "no conflict markers, leaving file as is");
            }
            MergeOutcome::Unresolved(reason) => {
                debug!(path = %shown, %reason, "could not merge file");
            }
        }
        Ok(outcome)
    }
}

/// Indices into `lines` that make up the merged file.
fn merge_lines(lines: &[String], hunks: &[ConflictHunk]) -> Result<Vec<usize>, UnresolvedReason> {
    let mut merged = Vec::with_capacity(lines.len());
    let mut end = 0;

    for (index, hunk) in hunks.iter().enumerate() {
        merged.extend(hunk.unconflicted.clone());
        let resolved = resolve_hunk(
            index,
            &lines[hunk.theirs.clone()],
            &lines[hunk.ours.clone()],
        )?;
        merged.extend(resolved.iter().enumerate().map(|(offset, line)| match line.side {
            Side::Theirs => hunk.theirs.start + offset,
            Side::Ours => hunk.ours.start + offset,
        }));
        end = hunk.end;
    }

    merged.extend(end..lines.len());
    Ok(merged)
}
