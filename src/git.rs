use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Locate the git directory for `start_dir`, walking up the tree.
/// Handles worktrees and submodules where `.git` is a `gitdir:` file.
pub fn find_git_dir(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(".git");
        if candidate.is_dir() {
            return Some(candidate);
        }
        if candidate.is_file() {
            let content = fs::read_to_string(&candidate).ok()?;
            let target = content.trim().strip_prefix("gitdir:")?.trim();
            let target = Path::new(target);
            return Some(if target.is_absolute() {
                target.to_path_buf()
            } else {
                current.join(target)
            });
        }
        current = current.parent()?;
    }
}

/// Branch name from the content of a HEAD file. Detached HEAD has no branch.
pub fn parse_head(content: &str) -> Option<String> {
    content
        .trim()
        .strip_prefix("ref:")
        .map(str::trim)
        .and_then(|reference| reference.strip_prefix("refs/heads/"))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

/// Current branch of the repository containing `start_dir`, if any
pub fn current_branch(start_dir: &Path) -> Result<Option<String>> {
    let Some(git_dir) = find_git_dir(start_dir) else {
        return Ok(None);
    };
    let head_path = git_dir.join("HEAD");
    if !head_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&head_path)
        .with_context(|| format!("Failed to read {}", head_path.display()))?;
    Ok(parse_head(&content))
}

/// Turns repeated "current branch" readings into change notifications
#[derive(Debug, Clone)]
pub struct BranchWatcher {
    repo_dir: PathBuf,
    last_branch: Option<String>,
}

impl BranchWatcher {
    /// Start watching, remembering the branch checked out right now
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        let repo_dir = repo_dir.into();
        let last_branch = current_branch(&repo_dir).ok().flatten();
        info!(
            branch = last_branch.as_deref().unwrap_or("none"),
            "git branch watcher initialized"
        );
        Self {
            repo_dir,
            last_branch,
        }
    }

    pub fn last_branch(&self) -> Option<&str> {
        self.last_branch.as_deref()
    }

    /// Feed a reading; returns the new branch only when it differs and is set
    pub fn observe(&mut self, branch: Option<String>) -> Option<String> {
        let branch = branch?;
        if self.last_branch.as_deref() == Some(branch.as_str()) {
            return None;
        }
        info!(
            from = self.last_branch.as_deref().unwrap_or("none"),
            to = %branch,
            "branch changed"
        );
        self.last_branch = Some(branch.clone());
        Some(branch)
    }

    /// Read HEAD and report a branch change, if any
    pub fn poll(&mut self) -> Result<Option<String>> {
        let branch = current_branch(&self.repo_dir)?;
        debug!(branch = branch.as_deref().unwrap_or("none"), "polled git HEAD");
        Ok(self.observe(branch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_on(branch_head: &str) -> tempfile::TempDir {
        let temp_dir = tempfile::tempdir().unwrap();
        let git_dir = temp_dir.path().join(".git");
        fs::create_dir_all(&git_dir).unwrap();
        fs::write(git_dir.join("HEAD"), branch_head).unwrap();
        temp_dir
    }

    #[test]
    fn test_parse_head() {
        assert_eq!(parse_head("ref: refs/heads/main\n"), Some("main".to_string()));
        assert_eq!(
            parse_head("ref: refs/heads/feat/x"),
            Some("feat/x".to_string())
        );
        assert_eq!(parse_head("3f2a9c0d1e4b5a6978877665544332211aabbccd\n"), None);
        assert_eq!(parse_head(""), None);
    }

    #[test]
    fn test_current_branch_from_nested_dir() {
        let repo = repo_on("ref: refs/heads/feat/login\n");
        let nested = repo.path().join("src").join("bin");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            current_branch(&nested).unwrap(),
            Some("feat/login".to_string())
        );
    }

    #[test]
    fn test_current_branch_through_gitdir_file() {
        let repo = repo_on("ref: refs/heads/main\n");
        let worktree = tempfile::tempdir().unwrap();
        fs::write(
            worktree.path().join(".git"),
            format!("gitdir: {}\n", repo.path().join(".git").display()),
        )
        .unwrap();

        assert_eq!(current_branch(worktree.path()).unwrap(), Some("main".to_string()));
    }

    #[test]
    fn test_watcher_reports_only_changes() {
        let repo = repo_on("ref: refs/heads/main\n");
        let mut watcher = BranchWatcher::new(repo.path());
        assert_eq!(watcher.last_branch(), Some("main"));

        // unchanged
        assert_eq!(watcher.poll().unwrap(), None);

        fs::write(repo.path().join(".git").join("HEAD"), "ref: refs/heads/feat/x\n").unwrap();
        assert_eq!(watcher.poll().unwrap(), Some("feat/x".to_string()));
        assert_eq!(watcher.poll().unwrap(), None);
    }

    #[test]
    fn test_watcher_ignores_missing_branch() {
        let repo = repo_on("ref: refs/heads/main\n");
        let mut watcher = BranchWatcher::new(repo.path());

        assert_eq!(watcher.observe(None), None);
        assert_eq!(watcher.last_branch(), Some("main"));
        assert_eq!(watcher.observe(Some("dev".to_string())), Some("dev".to_string()));
    }
}
