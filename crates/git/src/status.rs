use git2::Status as Git2Status;

/// A rename recorded in the status snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamedPath {
    /// Path before the rename, relative to the repository root
    pub old_path: String,
    /// Path after the rename, relative to the repository root
    pub new_path: String,
}

/// Working-tree status grouped into per-state buckets.
///
/// One path may appear in several buckets (e.g. a conflicted file that is
/// also modified); consumers decide precedence.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    /// Files modified in the index or working tree
    pub modified: Vec<String>,
    /// Files newly added to the index
    pub created: Vec<String>,
    /// Files deleted from the index or working tree
    pub deleted: Vec<String>,
    /// Files renamed in the index or working tree
    pub renamed: Vec<RenamedPath>,
    /// Files in a conflicted (unmerged) state
    pub conflicted: Vec<String>,
    /// Files not yet tracked
    pub untracked: Vec<String>,
    /// Files with any change recorded in the index
    pub staged: Vec<String>,
}

impl StatusSnapshot {
    /// Record a single git2 status flag set for a path
    pub(crate) fn record(&mut self, path: &str, status: Git2Status, old_path: Option<&str>) {
        if status.is_conflicted() {
            self.conflicted.push(path.to_string());
        }
        if status.is_index_new() {
            self.created.push(path.to_string());
        }
        if status.is_wt_new() {
            self.untracked.push(path.to_string());
        }
        if status.is_index_modified() || status.is_wt_modified() || status.is_index_typechange() || status.is_wt_typechange() {
            self.modified.push(path.to_string());
        }
        if status.is_index_deleted() || status.is_wt_deleted() {
            self.deleted.push(path.to_string());
        }
        if status.is_index_renamed() || status.is_wt_renamed() {
            self.renamed.push(RenamedPath {
                old_path: old_path.unwrap_or(path).to_string(),
                new_path: path.to_string(),
            });
        }
        if status.is_index_new()
            || status.is_index_modified()
            || status.is_index_deleted()
            || status.is_index_renamed()
            || status.is_index_typechange()
        {
            self.staged.push(path.to_string());
        }
    }

    /// All distinct paths mentioned anywhere in the snapshot, in bucket order
    pub fn all_paths(&self) -> Vec<String> {
        let mut seen = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        let buckets = [
            &self.conflicted,
            &self.staged,
            &self.untracked,
            &self.modified,
            &self.created,
            &self.deleted,
        ];
        for bucket in buckets {
            for path in bucket.iter() {
                if seen.insert(path.clone()) {
                    out.push(path.clone());
                }
            }
        }
        for rename in &self.renamed {
            if seen.insert(rename.new_path.clone()) {
                out.push(rename.new_path.clone());
            }
        }
        out
    }

    /// Whether no bucket contains any entry
    pub fn is_clean(&self) -> bool {
        self.modified.is_empty()
            && self.created.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty()
            && self.conflicted.is_empty()
            && self.untracked.is_empty()
    }
}
