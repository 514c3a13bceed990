use regex::Regex;

use crate::line_range::{ChangeKind, LineRange};

/// Parse unified-diff text into gutter line ranges.
///
/// Only the new-file side is tracked: added lines are marked at their
/// position in the new file, deleted lines are anchored to the line before
/// the deletion (deleted lines have no line of their own in the new file).
/// Lines outside hunks and `\ No newline at end of file` markers are
/// ignored, and a malformed hunk header skips that hunk rather than
/// aborting the parse.
pub fn parse_unified_diff(diff_text: &str) -> Vec<LineRange> {
    // `@@ -a,b +c,d @@` (counts optional, git emits `-a +c` for 1-line hunks)
    let hunk_header = Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@")
        .expect("hunk header pattern is valid");

    let mut ranges: Vec<LineRange> = Vec::new();
    let mut current_line: usize = 0;
    let mut in_hunk = false;

    for line in diff_text.lines() {
        if line.starts_with("@@") {
            match hunk_header
                .captures(line)
                .and_then(|caps| caps.get(3))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            {
                Some(new_start) => {
                    current_line = new_start.saturating_sub(1);
                    in_hunk = true;
                }
                None => {
                    // Malformed header: stay out of hunk mode until a good one
                    in_hunk = false;
                }
            }
            continue;
        }

        // Start of the next file section in a concatenated patch
        if line.starts_with("diff --git") || line.starts_with("--- ") || line.starts_with("+++ ") {
            in_hunk = false;
            continue;
        }

        if !in_hunk {
            continue;
        }

        if line.starts_with('\\') {
            // "\ No newline at end of file"
            continue;
        }

        if line.starts_with('+') {
            current_line += 1;
            push_line(&mut ranges, ChangeKind::Added, current_line);
        } else if line.starts_with('-') {
            // Deleted lines have no slot in the new file; anchor to the
            // line just before where they would have been
            push_line(&mut ranges, ChangeKind::Deleted, current_line);
        } else {
            // Context line
            current_line += 1;
        }
    }

    ranges
}

/// Append a changed line, extending the previous range when it is the same
/// kind and directly adjacent
fn push_line(ranges: &mut Vec<LineRange>, kind: ChangeKind, line: usize) {
    if let Some(last) = ranges.last_mut() {
        if last.kind == kind {
            if last.abuts(line) {
                last.end_line = line;
                return;
            }
            if last.contains(line) {
                return;
            }
        }
    }
    ranges.push(LineRange::single(kind, line));
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_input_yields_no_ranges() {
        assert_eq!(parse_unified_diff(""), vec![]);
        assert_eq!(parse_unified_diff("no hunks here\njust text\n"), vec![]);
    }

    #[test]
    fn mixed_hunk_yields_deleted_then_added() {
        let diff = "@@ -1,3 +1,4 @@\n unchanged\n-removed line\n+added line\n+second added\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(
            ranges,
            vec![
                LineRange {
                    kind: ChangeKind::Deleted,
                    start_line: 1,
                    end_line: 1
                },
                LineRange {
                    kind: ChangeKind::Added,
                    start_line: 2,
                    end_line: 3
                },
            ]
        );
    }

    #[test]
    fn adjacent_additions_coalesce() {
        let diff = "@@ -1,1 +1,3 @@\n context\n+one\n+two\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(
            ranges,
            vec![LineRange {
                kind: ChangeKind::Added,
                start_line: 2,
                end_line: 3
            }]
        );
    }

    #[test]
    fn separated_additions_stay_separate() {
        let diff = "@@ -1,3 +1,5 @@\n a\n+new1\n b\n+new2\n c\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start_line, 2);
        assert_eq!(ranges[1].start_line, 4);
    }

    #[test]
    fn repeated_deletions_collapse_onto_anchor() {
        // Several consecutive deletions all anchor to the same line
        let diff = "@@ -1,4 +1,1 @@\n keep\n-a\n-b\n-c\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(
            ranges,
            vec![LineRange {
                kind: ChangeKind::Deleted,
                start_line: 1,
                end_line: 1
            }]
        );
    }

    #[test]
    fn malformed_header_is_skipped() {
        let diff = "@@ garbage @@\n+ignored\n@@ -1,1 +1,2 @@\n keep\n+added\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(
            ranges,
            vec![LineRange {
                kind: ChangeKind::Added,
                start_line: 2,
                end_line: 2
            }]
        );
    }

    #[test]
    fn no_newline_marker_ignored() {
        let diff = "@@ -1,1 +1,1 @@\n-old\n+new\n\\ No newline at end of file\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].kind, ChangeKind::Deleted);
        assert_eq!(ranges[0].start_line, 0);
        assert_eq!(ranges[1].kind, ChangeKind::Added);
        assert_eq!(ranges[1].start_line, 1);
    }

    #[test]
    fn hunk_counter_restarts_per_hunk() {
        let diff = "@@ -1,1 +1,2 @@\n a\n+b\n@@ -10,1 +11,2 @@\n x\n+y\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0].start_line, 2);
        assert_eq!(ranges[1].start_line, 12);
    }

    #[test]
    fn file_headers_between_hunks_do_not_leak() {
        // Concatenated two-file patch: the second file's headers must not be
        // read as deletions or additions
        let diff = "@@ -1,1 +1,2 @@\n a\n+b\ndiff --git a/x b/x\n--- a/x\n+++ b/x\n@@ -1,1 +1,2 @@\n c\n+d\n";
        let ranges = parse_unified_diff(diff);
        assert_eq!(ranges.len(), 2);
        assert!(ranges.iter().all(|r| r.kind == ChangeKind::Added));
    }
}
