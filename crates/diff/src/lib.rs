// Gutter diff library for Shelvery
// Parses unified-diff text into contiguous line ranges for editor gutter
// decoration, and renders/parses git-style patch text for shelf export.

mod line_range;
mod parser;
mod patch;

pub use line_range::{ChangeKind, LineRange};
pub use parser::parse_unified_diff;
pub use patch::{parse_patch, unified_patch, FilePatch};
