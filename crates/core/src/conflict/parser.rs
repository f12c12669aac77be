//! Conflict-region scanning.
//!
//! Splits a conflicted file into lines and locates every
//! `<<<<<<<` / `=======` / `>>>>>>>` region in file order. The section after
//! `<<<<<<<` is the *theirs* side (the branch being rebased onto), the
//! section after `=======` is *ours* (the commit being replayed).

use std::ops::Range;

use tracing::debug;

/// Opens a conflict region; the lines after it are "theirs".
pub const THEIRS_MARKER: &str = "<<<<<<<";
/// Optional diff3-style base section; ends the "theirs" lines.
pub const BASE_MARKER: &str = "|||||||";
/// Separates "theirs" from "ours".
pub const MIDPOINT_MARKER: &str = "=======";
/// Closes a conflict region.
pub const OURS_MARKER: &str = ">>>>>>>";

/// One conflict region, as line-index ranges into the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictHunk {
    /// Unconflicted lines between the previous hunk (or file start) and this one.
    pub unconflicted: Range<usize>,
    /// Lines between the theirs marker and the midpoint (or base) marker.
    pub theirs: Range<usize>,
    /// Lines between the midpoint marker and the ours marker.
    pub ours: Range<usize>,
    /// First line after the ours marker.
    pub end: usize,
}

/// The markers of hunk `index` could not be matched in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedHunk {
    pub index: usize,
}

/// A text file split into lines, each remembering its own terminator.
///
/// Mixed `\n` / `\r\n` files render back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileText {
    /// Line contents without terminators.
    pub lines: Vec<String>,
    /// Terminator of each line: `"\r\n"`, `"\n"`, or `""` for a final
    /// line without a newline.
    pub endings: Vec<&'static str>,
}

impl FileText {
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();
        let mut endings = Vec::new();
        for raw in content.split_inclusive('\n') {
            let (line, ending) = if let Some(line) = raw.strip_suffix("\r\n") {
                (line, "\r\n")
            } else if let Some(line) = raw.strip_suffix('\n') {
                (line, "\n")
            } else {
                (raw, "")
            };
            lines.push(line.to_string());
            endings.push(ending);
        }
        Self { lines, endings }
    }

    pub fn trailing_newline(&self) -> bool {
        self.endings.last().is_some_and(|e| !e.is_empty())
    }

    /// Concatenate the lines at `indices`, each with its original terminator.
    pub fn render<I: IntoIterator<Item = usize>>(&self, indices: I) -> String {
        let mut out = String::new();
        for i in indices {
            out.push_str(&self.lines[i]);
            out.push_str(self.endings[i]);
        }
        out
    }
}

/// `true` if `line` is the given conflict marker, optionally followed by a label.
pub fn is_marker(line: &str, marker: &str) -> bool {
    match line.strip_prefix(marker) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// Locate every conflict hunk in `lines`.
///
/// The number of hunks is the number of theirs markers in the file; each
/// hunk's markers must appear strictly after the previous hunk's end.
/// Returns an empty list for a file without markers.
pub fn parse_hunks<S: AsRef<str>>(lines: &[S]) -> Result<Vec<ConflictHunk>, MalformedHunk> {
    let count = lines
        .iter()
        .filter(|l| is_marker(l.as_ref(), THEIRS_MARKER))
        .count();

    let mut hunks = Vec::with_capacity(count);
    let mut start = 0;

    for index in 0..count {
        let malformed = MalformedHunk { index };

        let theirs_at = find_marker(lines, start..lines.len(), THEIRS_MARKER).ok_or(malformed)?;
        let midpoint =
            find_marker(lines, theirs_at + 1..lines.len(), MIDPOINT_MARKER).ok_or(malformed)?;
        let ours_at = find_marker(lines, midpoint + 1..lines.len(), OURS_MARKER).ok_or(malformed)?;
        let theirs_end =
            find_marker(lines, theirs_at + 1..midpoint, BASE_MARKER).unwrap_or(midpoint);

        hunks.push(ConflictHunk {
            unconflicted: start..theirs_at,
            theirs: theirs_at + 1..theirs_end,
            ours: midpoint + 1..ours_at,
            end: ours_at + 1,
        });
        start = ours_at + 1;
    }

    debug!(count = hunks.len(), "parsed conflict hunks");
    Ok(hunks)
}

fn find_marker<S: AsRef<str>>(lines: &[S], range: Range<usize>, marker: &str) -> Option<usize> {
    range
        .clone()
        .zip(&lines[range])
        .find(|(_, line)| is_marker(line.as_ref(), marker))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        FileText::parse(text).lines
    }

    #[test]
    fn test_no_markers() {
        let l = lines("a\nb\nc\n");
        assert_eq!(parse_hunks(&l).unwrap(), Vec::new());
    }

    #[test]
    fn test_single_hunk() {
        let l = lines("head\n<<<<<<< HEAD\nt1\n=======\no1\n>>>>>>> abc123\ntail\n");
        let hunks = parse_hunks(&l).unwrap();
        assert_eq!(
            hunks,
            vec![ConflictHunk {
                unconflicted: 0..1,
                theirs: 2..3,
                ours: 4..5,
                end: 6,
            }]
        );
    }

    #[test]
    fn test_multiple_hunks_in_order() {
        let l = lines(
            "<<<<<<<\nt1\n=======\no1\n>>>>>>>\nmid\n<<<<<<<\nt2\nt3\n=======\no2\no3\n>>>>>>>\n",
        );
        let hunks = parse_hunks(&l).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[0].unconflicted, 0..0);
        assert_eq!(hunks[1].unconflicted, 5..6);
        assert_eq!(hunks[1].theirs, 7..9);
        assert_eq!(hunks[1].ours, 10..12);
        assert_eq!(hunks[1].end, 13);
    }

    #[test]
    fn test_diff3_base_section_is_skipped() {
        let l = lines("<<<<<<< ours\nt\n||||||| base\nb\n=======\no\n>>>>>>> theirs\n");
        let hunks = parse_hunks(&l).unwrap();
        assert_eq!(hunks[0].theirs, 1..2);
        assert_eq!(hunks[0].ours, 5..6);
    }

    #[test]
    fn test_missing_close_marker() {
        let l = lines("<<<<<<<\nt\n=======\no\n");
        assert_eq!(parse_hunks(&l), Err(MalformedHunk { index: 0 }));
    }

    #[test]
    fn test_out_of_order_markers() {
        let l = lines(">>>>>>>\n=======\n<<<<<<<\nt\n");
        assert_eq!(parse_hunks(&l), Err(MalformedHunk { index: 0 }));
    }

    #[test]
    fn test_nested_open_marker_fails_second_hunk() {
        let l = lines("<<<<<<<\n<<<<<<<\n=======\no\n>>>>>>>\n");
        assert_eq!(parse_hunks(&l), Err(MalformedHunk { index: 1 }));
    }

    #[test]
    fn test_marker_requires_exact_prefix() {
        assert!(is_marker("=======", MIDPOINT_MARKER));
        assert!(is_marker("<<<<<<< HEAD", THEIRS_MARKER));
        assert!(!is_marker("========", MIDPOINT_MARKER));
        assert!(!is_marker(" <<<<<<<", THEIRS_MARKER));
    }

    #[test]
    fn test_file_text_preserves_crlf() {
        let text = FileText::parse("a\r\nb\r\n");
        assert_eq!(text.lines, vec!["a", "b"]);
        assert_eq!(text.render(0..text.lines.len()), "a\r\nb\r\n");
    }

    #[test]
    fn test_file_text_keeps_mixed_endings() {
        let text = FileText::parse("x\r\ny\nz");
        assert_eq!(text.lines, vec!["x", "y", "z"]);
        assert_eq!(text.endings, vec!["\r\n", "\n", ""]);
        assert_eq!(text.render(0..3), "x\r\ny\nz");
        assert_eq!(text.render([1, 0]), "y\nx\r\n");
    }

    #[test]
    fn test_file_text_without_trailing_newline() {
        let text = FileText::parse("a\nb");
        assert!(!text.trailing_newline());
        assert_eq!(text.render(0..text.lines.len()), "a\nb");
        assert!(FileText::parse("a\n").trailing_newline());
    }

    #[test]
    fn test_file_text_empty() {
        let text = FileText::parse("");
        assert!(text.lines.is_empty());
        assert!(!text.trailing_newline());
        assert_eq!(text.render(0..0), "");
    }
}
