use derive_more::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kind of change a gutter range represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChangeKind {
    /// Lines that exist only in the new version
    #[display(fmt = "added")]
    Added,

    /// Lines that differ between the two versions
    #[display(fmt = "modified")]
    Modified,

    /// Lines removed from the old version, anchored to the preceding line
    #[display(fmt = "deleted")]
    Deleted,
}

/// A contiguous run of changed lines (0-based, inclusive bounds)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineRange {
    /// What kind of change the range marks
    pub kind: ChangeKind,
    /// First line of the range
    pub start_line: usize,
    /// Last line of the range (inclusive)
    pub end_line: usize,
}

impl LineRange {
    /// Create a single-line range
    pub fn single(kind: ChangeKind, line: usize) -> Self {
        Self {
            kind,
            start_line: line,
            end_line: line,
        }
    }

    /// Number of lines covered by the range
    pub fn line_count(&self) -> usize {
        self.end_line - self.start_line + 1
    }

    /// Whether the range covers the given line
    pub fn contains(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Whether `line` directly follows the range, so a same-kind change on
    /// it should extend the range instead of starting a new one
    pub fn abuts(&self, line: usize) -> bool {
        line == self.end_line + 1
    }
}
