use similar::{Algorithm, TextDiff};

/// One file's worth of a multi-file patch, with the content recoverable
/// from its hunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    /// Repository-relative path (the `b/` side of the header)
    pub path: String,
    /// Old-side content reconstructed from hunk context and `-` lines
    pub old_content: String,
    /// New-side content reconstructed from hunk context and `+` lines
    pub new_content: String,
}

/// Render a git-style unified patch for a single file
pub fn unified_patch(path: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .timeout(std::time::Duration::from_secs(5))
        .diff_lines(old, new);

    let body = diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", path), &format!("b/{}", path))
        .to_string();

    format!("diff --git a/{} b/{}\n{}", path, path, body)
}

/// Parse concatenated git-style unified patch text back into per-file
/// content pairs.
///
/// Reconstruction is hunk-based: only lines that appear in hunks (context,
/// `-`, `+`) are recovered, so a file is reproduced exactly when its hunks
/// cover it end to end. Unknown lines between files are skipped.
pub fn parse_patch(patch_text: &str) -> Vec<FilePatch> {
    let mut files: Vec<FilePatch> = Vec::new();
    let mut in_hunk = false;
    // Which side(s) the previous hunk line landed on, so the
    // "\ No newline at end of file" marker knows what to trim
    let mut last_in_old = false;
    let mut last_in_new = false;

    for line in patch_text.lines() {
        if let Some(rest) = line.strip_prefix("diff --git a/") {
            let path = rest
                .split_once(" b/")
                .map(|(_, b)| b.to_string())
                .unwrap_or_else(|| rest.to_string());
            files.push(FilePatch {
                path,
                old_content: String::new(),
                new_content: String::new(),
            });
            in_hunk = false;
            last_in_old = false;
            last_in_new = false;
            continue;
        }

        if line.starts_with("--- ") || line.starts_with("+++ ") {
            in_hunk = false;
            continue;
        }

        if line.starts_with("@@") {
            in_hunk = files.last().is_some();
            continue;
        }

        if !in_hunk {
            continue;
        }
        let Some(current) = files.last_mut() else {
            continue;
        };

        if line.starts_with('\\') {
            // "\ No newline at end of file": the previous hunk line has no
            // trailing newline, so drop the one appended for it
            if last_in_old && current.old_content.ends_with('\n') {
                current.old_content.pop();
            }
            if last_in_new && current.new_content.ends_with('\n') {
                current.new_content.pop();
            }
            continue;
        }

        if let Some(text) = line.strip_prefix('+') {
            current.new_content.push_str(text);
            current.new_content.push('\n');
            last_in_old = false;
            last_in_new = true;
        } else if let Some(text) = line.strip_prefix('-') {
            current.old_content.push_str(text);
            current.old_content.push('\n');
            last_in_old = true;
            last_in_new = false;
        } else {
            let text = line.strip_prefix(' ').unwrap_or(line);
            current.old_content.push_str(text);
            current.old_content.push('\n');
            current.new_content.push_str(text);
            current.new_content.push('\n');
            last_in_old = true;
            last_in_new = true;
        }
    }

    files
}
