use chrono::{DateTime, Utc};
use gutter_diff::ChangeKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::file_change::FileChangeStatus;

/// A line-by-line edit between the shelf baseline and a later version.
/// Positional comparison, deliberately simpler than a minimal diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEdit {
    /// 0-based line number in the newer version
    pub line: usize,
    pub kind: ChangeKind,
}

/// One line where the working tree and the shelved snapshot both diverged
/// from the baseline, in incompatible ways
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictLine {
    /// 0-based line number
    pub line: usize,
    pub original: Option<String>,
    pub shelved: Option<String>,
    pub current: Option<String>,
}

/// Content snapshot of one file at shelve time.
///
/// `original_content` is the last known-clean baseline (the HEAD blob at
/// shelve time), `shelved_content` is what the working tree held. Both are
/// immutable once captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelvedFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the workspace root
    pub relative_path: String,
    /// Baseline content captured at shelve time
    pub original_content: String,
    /// Working-tree content captured at shelve time
    pub shelved_content: String,
    pub status: FileChangeStatus,
    pub encoding: String,
}

impl ShelvedFile {
    pub fn new(
        path: PathBuf,
        relative_path: String,
        original_content: String,
        shelved_content: String,
        status: FileChangeStatus,
    ) -> Self {
        Self {
            path,
            relative_path,
            original_content,
            shelved_content,
            status,
            encoding: "utf-8".to_string(),
        }
    }

    /// Positional line diff of the shelved content against the baseline
    pub fn line_diff(&self) -> Vec<LineEdit> {
        diff_lines(&self.original_content, &self.shelved_content)
    }

    /// Two-way conflict detection against the current on-disk content.
    ///
    /// A line conflicts when both the shelved snapshot and `current`
    /// diverged from the baseline, and from each other. Lines where the
    /// working tree still holds the shelved content are not conflicts, so a
    /// preview run straight after shelving is clean.
    pub fn detect_conflicts(&self, current: &str) -> Vec<ConflictLine> {
        let original: Vec<&str> = split_lines(&self.original_content);
        let shelved: Vec<&str> = split_lines(&self.shelved_content);
        let current: Vec<&str> = split_lines(current);

        let line_count = original.len().max(shelved.len()).max(current.len());
        let mut conflicts = Vec::new();

        for line in 0..line_count {
            let orig = original.get(line).copied();
            let shel = shelved.get(line).copied();
            let curr = current.get(line).copied();

            if shel != orig && curr != orig && curr != shel {
                conflicts.push(ConflictLine {
                    line,
                    original: orig.map(str::to_string),
                    shelved: shel.map(str::to_string),
                    current: curr.map(str::to_string),
                });
            }
        }

        conflicts
    }

    /// Whether the file can be restored without force: the on-disk content
    /// still equals the baseline, or already equals the shelved content
    /// (writing it again is a no-op). A missing file is restorable (nothing
    /// to clobber).
    pub fn can_restore(&self, current: Option<&str>) -> bool {
        match current {
            Some(content) => content == self.original_content || content == self.shelved_content,
            None => true,
        }
    }

    /// Byte-size change the shelved edit represents
    pub fn size_delta(&self) -> i64 {
        self.shelved_content.len() as i64 - self.original_content.len() as i64
    }

    /// Git-style unified patch from baseline to shelved content
    pub fn to_patch(&self) -> String {
        gutter_diff::unified_patch(
            &self.relative_path,
            &self.original_content,
            &self.shelved_content,
        )
    }
}

/// A named snapshot of selected files, set aside for later restoration.
/// Immutable; updaters return a new shelf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shelf {
    pub id: String,
    pub name: String,
    pub files: Vec<ShelvedFile>,
    pub timestamp: DateTime<Utc>,
    /// Branch checked out at shelve time
    pub branch: String,
    /// Commit HEAD pointed at when the shelf was created
    pub parent_commit: String,
    /// Changelist the shelf was created from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changelist_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Shelf {
    pub fn new(
        id: String,
        name: String,
        files: Vec<ShelvedFile>,
        branch: String,
        parent_commit: String,
    ) -> Self {
        Self {
            id,
            name,
            files,
            timestamp: Utc::now(),
            branch,
            parent_commit,
            changelist_id: None,
            description: None,
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn file(&self, relative_path: &str) -> Option<&ShelvedFile> {
        self.files.iter().find(|f| f.relative_path == relative_path)
    }

    pub fn with_name(&self, name: String) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_description(&self, description: Option<String>) -> Self {
        Self {
            description,
            ..self.clone()
        }
    }

    pub fn with_changelist_id(&self, changelist_id: Option<String>) -> Self {
        Self {
            changelist_id,
            ..self.clone()
        }
    }

    /// Concatenated per-file patches, the shelf's export format
    pub fn to_patch(&self) -> String {
        self.files.iter().map(|f| f.to_patch()).collect()
    }
}

/// Split into lines without treating a trailing newline as an extra empty
/// line
fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.lines().collect()
}

/// Positional comparison of two texts: same index and equal → unchanged,
/// same index and different → modified, tail-only lines → added or deleted
fn diff_lines(old: &str, new: &str) -> Vec<LineEdit> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let mut edits = Vec::new();

    for line in 0..old_lines.len().max(new_lines.len()) {
        match (old_lines.get(line), new_lines.get(line)) {
            (Some(o), Some(n)) if o != n => edits.push(LineEdit {
                line,
                kind: ChangeKind::Modified,
            }),
            (Some(_), Some(_)) => {}
            (None, Some(_)) => edits.push(LineEdit {
                line,
                kind: ChangeKind::Added,
            }),
            (Some(_), None) => edits.push(LineEdit {
                line,
                kind: ChangeKind::Deleted,
            }),
            (None, None) => {}
        }
    }

    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shelved(original: &str, shelved: &str) -> ShelvedFile {
        ShelvedFile::new(
            PathBuf::from("/repo/a.txt"),
            "a.txt".to_string(),
            original.to_string(),
            shelved.to_string(),
            FileChangeStatus::Modified,
        )
    }

    #[test]
    fn incompatible_edits_conflict_on_one_line() {
        let file = shelved("a\nb\nc", "a\nX\nc");
        let conflicts = file.detect_conflicts("a\nY\nc");

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].line, 1);
        assert_eq!(conflicts[0].original.as_deref(), Some("b"));
        assert_eq!(conflicts[0].shelved.as_deref(), Some("X"));
        assert_eq!(conflicts[0].current.as_deref(), Some("Y"));
    }

    #[test]
    fn unchanged_working_tree_has_no_conflicts() {
        let file = shelved("a\nb\nc", "a\nX\nc");
        assert!(file.detect_conflicts("a\nb\nc").is_empty());
        assert!(file.can_restore(Some("a\nb\nc")));
    }

    #[test]
    fn working_tree_equal_to_shelved_is_not_a_conflict() {
        // Preview straight after shelving sees current == shelved
        let file = shelved("a\nb\nc", "a\nX\nc");
        assert!(file.detect_conflicts("a\nX\nc").is_empty());
        // Re-writing identical content is a no-op, so it is restorable
        assert!(file.can_restore(Some("a\nX\nc")));
    }

    #[test]
    fn diverged_content_without_line_conflicts_still_blocks_restore() {
        // Shelf edited line 0, working tree edited line 1: no line
        // conflicts, but writing the shelf would clobber the line-1 edit
        let file = shelved("a\nb", "X\nb");
        assert!(file.detect_conflicts("a\nY").is_empty());
        assert!(!file.can_restore(Some("a\nY")));
    }

    #[test]
    fn missing_file_is_restorable() {
        let file = shelved("a\n", "b\n");
        assert!(file.can_restore(None));
    }

    #[test]
    fn line_diff_classifies_positionally() {
        let file = shelved("one\ntwo\nthree", "one\nTWO\nthree\nfour");
        let edits = file.line_diff();

        assert_eq!(
            edits,
            vec![
                LineEdit {
                    line: 1,
                    kind: ChangeKind::Modified
                },
                LineEdit {
                    line: 3,
                    kind: ChangeKind::Added
                },
            ]
        );
    }

    #[test]
    fn size_delta_signed() {
        assert_eq!(shelved("abc", "abcdef").size_delta(), 3);
        assert_eq!(shelved("abcdef", "abc").size_delta(), -3);
    }

    #[test]
    fn shelf_patch_concatenates_files() {
        let shelf = Shelf::new(
            "shelf-1".into(),
            "WIP".into(),
            vec![shelved("a\n", "b\n"), shelved("x\n", "y\n")],
            "main".into(),
            "abc123".into(),
        );

        let patch = shelf.to_patch();
        assert_eq!(patch.matches("diff --git").count(), 2);
    }

    #[test]
    fn shelf_serde_round_trip() {
        let shelf = Shelf::new(
            "shelf-1".into(),
            "WIP".into(),
            vec![shelved("a\n", "b\n")],
            "main".into(),
            "abc123".into(),
        )
        .with_description(Some("half-done refactor".into()))
        .with_changelist_id(Some("default".into()));

        let json = serde_json::to_value(&shelf).unwrap();
        assert_eq!(json["parentCommit"], "abc123");
        assert_eq!(json["changelistId"], "default");
        assert_eq!(json["files"][0]["originalContent"], "a\n");

        let back: Shelf = serde_json::from_value(json).unwrap();
        assert_eq!(back, shelf);
    }
}
