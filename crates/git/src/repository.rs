use anyhow::{anyhow, Context, Result};
use git2::build::CheckoutBuilder;
use git2::{DiffFormat, DiffOptions, Repository as Git2Repository, Sort};
use path_clean::PathClean;
use std::path::{Path, PathBuf};

use crate::status::StatusSnapshot;

/// Represents a git commit
#[derive(Debug, Clone)]
pub struct Commit {
    /// The commit's SHA-1 hash
    pub id: String,
    /// The commit's short hash (first 7 characters)
    pub short_id: String,
    /// The first line of the commit message
    pub message: String,
    /// The commit author name
    pub author_name: String,
    /// The commit timestamp (seconds since epoch)
    pub time: i64,
}

/// A wrapper around git2::Repository with the operations the changelist
/// and shelve stores need
pub struct Repository {
    /// The underlying git2 repository
    inner: Git2Repository,
    /// The repository's working directory
    work_dir: PathBuf,
}

impl Repository {
    /// Open a git repository at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repository::discover(path)
            .with_context(|| format!("Failed to discover git repository at {}", path.display()))?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| anyhow!("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            inner: repo,
            work_dir,
        })
    }

    /// Get the repository's working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Turn an absolute path into a cleaned repository-relative path.
    /// Returns None for paths outside the working directory.
    pub fn relative_path(&self, absolute: &Path) -> Option<String> {
        let relative = pathdiff::diff_paths(absolute.clean(), &self.work_dir)?;
        if relative.starts_with("..") {
            return None;
        }
        Some(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Get the working-tree status, grouped into per-state buckets
    pub fn status(&self) -> Result<StatusSnapshot> {
        let mut opts = git2::StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .renames_head_to_index(true)
            .renames_index_to_workdir(true);

        let statuses = self.inner.statuses(Some(&mut opts))?;

        let mut snapshot = StatusSnapshot::default();
        for entry in statuses.iter() {
            let path = entry.path().unwrap_or("").to_string();
            let old_path = entry
                .head_to_index()
                .or_else(|| entry.index_to_workdir())
                .and_then(|delta| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string());

            snapshot.record(&path, entry.status(), old_path.as_deref());
        }

        Ok(snapshot)
    }

    /// Get the content of a file from the repository HEAD.
    /// Returns None when the path does not exist in the HEAD tree.
    pub fn head_content(&self, path: &str) -> Result<Option<String>> {
        let commit = match self.inner.head() {
            Ok(head) => head.peel_to_commit()?,
            Err(_) => return Ok(None),
        };
        let tree = commit.tree()?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(_) => return Ok(None),
        };

        let blob = entry.to_object(&self.inner)?.peel_to_blob()?;
        Ok(Some(String::from_utf8_lossy(blob.content()).to_string()))
    }

    /// Get the content of a file from the working directory
    pub fn working_content(&self, path: &str) -> Result<Option<String>> {
        let full_path = self.work_dir.join(path);
        if !full_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&full_path)
            .with_context(|| format!("Failed to read file {}", full_path.display()))?;

        Ok(Some(content))
    }

    /// Name of the currently checked-out branch
    pub fn current_branch(&self) -> Result<String> {
        let head = self.inner.head().context("Repository has no HEAD")?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    /// Full id of the commit HEAD points at
    pub fn head_commit_id(&self) -> Result<String> {
        let head = self.inner.head().context("Repository has no HEAD")?;
        Ok(head.peel_to_commit()?.id().to_string())
    }

    /// Names of all local branches
    pub fn branch_list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for branch in self.inner.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Stage the given repository-relative paths. Deleted files are removed
    /// from the index, everything else is added.
    pub fn stage_paths(&self, paths: &[String]) -> Result<()> {
        let mut index = self.inner.index()?;
        for path in paths {
            if self.work_dir.join(path).exists() {
                index.add_path(Path::new(path))?;
            } else {
                index.remove_path(Path::new(path))?;
            }
        }
        index.write()?;
        Ok(())
    }

    /// Unstage the given repository-relative paths, resetting the index
    /// entries back to HEAD
    pub fn unstage_paths(&self, paths: &[String]) -> Result<()> {
        let head = self.inner.head()?.peel(git2::ObjectType::Commit)?;
        self.inner
            .reset_default(Some(&head), paths.iter().map(Path::new))?;
        Ok(())
    }

    /// Create a commit from the current index state and return its id
    pub fn commit(&self, message: &str) -> Result<String> {
        let mut index = self.inner.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.inner.find_tree(tree_id)?;

        let signature = self
            .inner
            .signature()
            .or_else(|_| git2::Signature::now("shelvery", "shelvery@localhost"))?;

        let parent = match self.inner.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .inner
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(oid.to_string())
    }

    /// Restore the given repository-relative paths to their HEAD content,
    /// discarding working-tree edits
    pub fn checkout_paths(&self, paths: &[String]) -> Result<()> {
        let mut builder = CheckoutBuilder::new();
        builder.force().update_index(false);
        for path in paths {
            builder.path(path);
        }
        self.inner
            .checkout_head(Some(&mut builder))
            .context("Failed to check out paths from HEAD")?;
        Ok(())
    }

    /// Unified patch text for the HEAD → working tree changes of one path
    pub fn workdir_patch(&self, path: &str) -> Result<String> {
        let mut diff_opts = DiffOptions::new();
        diff_opts.pathspec(path).context_lines(3);

        let head_tree = match self.inner.head() {
            Ok(head) => Some(head.peel_to_commit()?.tree()?),
            Err(_) => None,
        };

        let diff = self.inner.diff_tree_to_workdir_with_index(
            head_tree.as_ref(),
            Some(&mut diff_opts),
        )?;

        let mut patch = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            match line.origin() {
                '+' | '-' | ' ' => patch.push(line.origin()),
                _ => {}
            }
            patch.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;

        Ok(patch)
    }

    /// Get the commit history, optionally limited to a maximum count
    pub fn log(&self, max_count: Option<usize>) -> Result<Vec<Commit>> {
        let mut revwalk = self.inner.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_head()?;

        let mut commits = Vec::new();
        let limit = max_count.unwrap_or(usize::MAX);

        for (i, oid_result) in revwalk.enumerate() {
            if i >= limit {
                break;
            }

            let oid = oid_result?;
            let commit = self.inner.find_commit(oid)?;

            let message = commit
                .message()
                .unwrap_or("")
                .lines()
                .next()
                .unwrap_or("")
                .to_string();

            let author = commit.author();

            commits.push(Commit {
                id: oid.to_string(),
                short_id: format!("{:.7}", oid),
                message,
                author_name: author.name().unwrap_or("Unknown").to_string(),
                time: commit.time().seconds(),
            });
        }

        Ok(commits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = TempDir::new().unwrap();
        Git2Repository::init(dir.path()).unwrap();
        let repo = Repository::open(dir.path()).unwrap();
        (dir, repo)
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn status_buckets_untracked_and_modified() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "one\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        repo.commit("initial").unwrap();

        write_file(&dir, "a.txt", "one\ntwo\n");
        write_file(&dir, "b.txt", "new\n");

        let snapshot = repo.status().unwrap();
        assert!(snapshot.modified.contains(&"a.txt".to_string()));
        assert!(snapshot.untracked.contains(&"b.txt".to_string()));
        assert!(snapshot.staged.is_empty());
    }

    #[test]
    fn head_content_returns_committed_blob() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "committed\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        repo.commit("initial").unwrap();

        write_file(&dir, "a.txt", "edited\n");

        assert_eq!(
            repo.head_content("a.txt").unwrap().as_deref(),
            Some("committed\n")
        );
        assert_eq!(
            repo.working_content("a.txt").unwrap().as_deref(),
            Some("edited\n")
        );
        assert_eq!(repo.head_content("missing.txt").unwrap(), None);
    }

    #[test]
    fn unstage_paths_resets_index_to_head() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "base\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        repo.commit("initial").unwrap();

        write_file(&dir, "a.txt", "edited\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        assert!(repo.status().unwrap().staged.contains(&"a.txt".to_string()));

        repo.unstage_paths(&["a.txt".to_string()]).unwrap();
        let snapshot = repo.status().unwrap();
        assert!(snapshot.staged.is_empty());
        // The edit itself survives as a working-tree modification
        assert!(snapshot.modified.contains(&"a.txt".to_string()));
    }

    #[test]
    fn checkout_paths_discards_edits() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "clean\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        repo.commit("initial").unwrap();

        write_file(&dir, "a.txt", "dirty\n");
        repo.checkout_paths(&["a.txt".to_string()]).unwrap();

        assert_eq!(
            repo.working_content("a.txt").unwrap().as_deref(),
            Some("clean\n")
        );
    }

    #[test]
    fn workdir_patch_contains_hunk() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "one\ntwo\nthree\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        repo.commit("initial").unwrap();

        write_file(&dir, "a.txt", "one\nTWO\nthree\n");

        let patch = repo.workdir_patch("a.txt").unwrap();
        assert!(patch.contains("@@"));
        assert!(patch.contains("-two"));
        assert!(patch.contains("+TWO"));
    }

    #[test]
    fn branch_and_head_metadata() {
        let (dir, repo) = init_repo();
        write_file(&dir, "a.txt", "x\n");
        repo.stage_paths(&["a.txt".to_string()]).unwrap();
        let id = repo.commit("initial").unwrap();

        assert_eq!(repo.head_commit_id().unwrap(), id);
        let branch = repo.current_branch().unwrap();
        assert!(repo.branch_list().unwrap().contains(&branch));

        let log = repo.log(Some(10)).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, "initial");
    }

    #[test]
    fn relative_path_inside_and_outside() {
        let (dir, repo) = init_repo();
        let inside = dir.path().join("sub").join("f.txt");
        assert_eq!(repo.relative_path(&inside).as_deref(), Some("sub/f.txt"));
        assert_eq!(repo.relative_path(Path::new("/definitely/elsewhere")), None);
    }
}
