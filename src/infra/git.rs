use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::change::{ChangeSet, ChangeSetBuilder, ChangesSummary};
use crate::error::{AppError, AppResult};
use crate::services::VersionControlService;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);
const DIFF_TIMEOUT: Duration = Duration::from_secs(10);
const METADATA_OUTPUT_LIMIT: usize = 1024 * 1024;
const STATUS_OUTPUT_LIMIT: usize = 5 * 1024 * 1024;
const STDERR_LIMIT: usize = 64 * 1024;

#[derive(Debug, Clone, Copy)]
struct Limits {
    timeout: Duration,
    max_output: usize,
}

impl Limits {
    const METADATA: Limits = Limits {
        timeout: METADATA_TIMEOUT,
        max_output: METADATA_OUTPUT_LIMIT,
    };

    const STATUS: Limits = Limits {
        timeout: METADATA_TIMEOUT,
        max_output: STATUS_OUTPUT_LIMIT,
    };

    fn diff(max_output: usize) -> Self {
        Self {
            timeout: DIFF_TIMEOUT,
            max_output,
        }
    }
}

struct GitOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn failure_message(&self, command: &str) -> String {
        let stderr = self.stderr.trim();
        match self.code {
            Some(code) if stderr.is_empty() => format!("git {command} exited with status {code}"),
            Some(code) => format!("git {command} exited with status {code}: {stderr}"),
            None => format!("git {command} was terminated by a signal"),
        }
    }
}

#[derive(Debug)]
enum GitFailure {
    Spawn(io::Error),
    Io(io::Error),
    TimedOut(Duration),
    OutputTooLarge { size: usize },
}

impl From<GitFailure> for AppError {
    fn from(failure: GitFailure) -> Self {
        match failure {
            GitFailure::Spawn(err) => AppError::VersionControl(format!("failed to run git: {err}")),
            GitFailure::Io(err) => {
                AppError::VersionControl(format!("failed to read git output: {err}"))
            }
            GitFailure::TimedOut(limit) => AppError::VersionControl(format!(
                "git did not finish within {} seconds",
                limit.as_secs()
            )),
            GitFailure::OutputTooLarge { size } => {
                AppError::VersionControl(format!("git produced {size} bytes of output, over the limit"))
            }
        }
    }
}

/// Output of one whole-repository section.
enum Section {
    Text(String),
    Oversize(usize),
}

impl Section {
    fn size(&self) -> usize {
        match self {
            Section::Text(text) => text.len(),
            Section::Oversize(size) => *size,
        }
    }
}

/// Runs the `git` binary for every query. Holds no state; each call names the
/// directory it runs in.
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    async fn tracked_relative_path(&self, root: &Path, path: &Path) -> AppResult<String> {
        let resolved = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        let relative = resolved
            .strip_prefix(root)
            .or_else(|_| path.strip_prefix(root))
            .map_err(|_| AppError::FileUntracked(path.display().to_string()))?;
        let relative = relative.to_string_lossy().replace('\\', "/");

        let output = run_git(
            root,
            &["ls-files", "--error-unmatch", "--", &relative],
            Limits::METADATA,
        )
        .await?;
        if output.success() {
            Ok(relative)
        } else {
            Err(AppError::FileUntracked(relative))
        }
    }

    async fn section(&self, root: &Path, args: &[&str], max_bytes: usize) -> AppResult<Section> {
        match run_git(root, args, Limits::diff(max_bytes)).await {
            Ok(output) if output.success() => Ok(Section::Text(output.stdout)),
            Ok(output) => Err(AppError::VersionControl(
                output.failure_message(&args.join(" ")),
            )),
            Err(GitFailure::OutputTooLarge { size }) => Ok(Section::Oversize(size)),
            Err(failure) => Err(failure.into()),
        }
    }

    async fn status(&self, root: &Path) -> AppResult<String> {
        let output = run_git(root, &["status", "--porcelain"], Limits::STATUS).await?;
        if output.success() {
            Ok(output.stdout)
        } else {
            Err(AppError::VersionControl(output.failure_message("status")))
        }
    }
}

#[async_trait]
impl VersionControlService for GitCli {
    async fn is_repository(&self, path: &Path) -> bool {
        let dir = working_dir(path).await;
        match run_git(&dir, &["rev-parse", "--git-dir"], Limits::METADATA).await {
            Ok(output) if output.success() => !output.stdout.trim().is_empty(),
            Ok(output) => {
                debug!(path = %path.display(), "not a git repository: {}", output.stderr.trim());
                false
            }
            Err(failure) => {
                debug!(path = %path.display(), ?failure, "repository check failed");
                false
            }
        }
    }

    async fn repository_root(&self, path: &Path) -> Option<PathBuf> {
        let dir = working_dir(path).await;
        match run_git(&dir, &["rev-parse", "--show-toplevel"], Limits::METADATA).await {
            Ok(output) if output.success() => {
                let root = output.stdout.trim();
                (!root.is_empty()).then(|| PathBuf::from(root))
            }
            Ok(output) => {
                debug!(path = %path.display(), "no repository root: {}", output.stderr.trim());
                None
            }
            Err(failure) => {
                debug!(path = %path.display(), ?failure, "repository root lookup failed");
                None
            }
        }
    }

    async fn single_file_diff(&self, path: &Path, max_bytes: usize) -> AppResult<ChangeSet> {
        let Some(root) = self.repository_root(path).await else {
            debug!(path = %path.display(), "could not determine repository root");
            return Ok(ChangeSet::empty());
        };

        let relative = match self.tracked_relative_path(&root, path).await {
            Ok(relative) => relative,
            Err(AppError::FileUntracked(relative)) => {
                debug!(file = %relative, "file not tracked by git");
                return Ok(ChangeSet::empty());
            }
            Err(err) => return Err(err),
        };

        let change_set = match run_git(&root, &["diff", "--", &relative], Limits::diff(max_bytes))
            .await
        {
            Ok(output) if output.success() => ChangeSet::new(output.stdout),
            // exit status 1 without a message is git's "differences: none"
            Ok(output) if output.code == Some(1) && output.stderr.trim().is_empty() => {
                debug!(file = %relative, "no diff found");
                ChangeSet::empty()
            }
            Ok(output) => return Err(AppError::VersionControl(output.failure_message("diff"))),
            Err(GitFailure::OutputTooLarge { size }) => {
                warn!(file = %relative, bytes = size, "diff too large, skipping");
                return Ok(ChangeSet::empty());
            }
            Err(failure) => return Err(failure.into()),
        };

        if change_set.exceeds(max_bytes) {
            warn!(file = %relative, bytes = change_set.len(), "diff too large, skipping");
            return Ok(ChangeSet::empty());
        }
        Ok(change_set)
    }

    async fn repository_diff(&self, root: &Path, max_bytes: usize) -> AppResult<ChangeSet> {
        let unstaged = self.section(root, &["diff"], max_bytes).await?;
        let staged = self.section(root, &["diff", "--cached"], max_bytes).await?;
        let untracked = self
            .section(root, &["ls-files", "--others", "--exclude-standard"], max_bytes)
            .await?;

        let sections = [
            ("Unstaged Changes", unstaged),
            ("Staged Changes", staged),
            ("Untracked Files", untracked),
        ];
        if sections
            .iter()
            .any(|(_, section)| matches!(section, Section::Oversize(_)))
        {
            let size = sections.iter().map(|(_, section)| section.size()).sum();
            return Err(AppError::diff_too_large(size, max_bytes));
        }

        let change_set = sections
            .iter()
            .fold(ChangeSetBuilder::new(), |builder, (title, section)| match section {
                Section::Text(body) => builder.section(title, body),
                Section::Oversize(_) => builder,
            })
            .build();

        if change_set.exceeds(max_bytes) {
            return Err(AppError::diff_too_large(change_set.len(), max_bytes));
        }
        Ok(change_set)
    }

    async fn changes_summary(&self, root: &Path) -> ChangesSummary {
        match self.status(root).await {
            Ok(output) => ChangesSummary::from_porcelain(&output),
            Err(err) => {
                debug!(root = %root.display(), "could not summarize changes: {err}");
                ChangesSummary::empty()
            }
        }
    }

    async fn has_changes(&self, root: &Path) -> bool {
        match self.status(root).await {
            Ok(output) => !output.trim().is_empty(),
            Err(err) => {
                debug!(root = %root.display(), "could not check for changes: {err}");
                false
            }
        }
    }
}

async fn working_dir(path: &Path) -> PathBuf {
    let is_dir = tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false);
    if is_dir {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

async fn run_git(cwd: &Path, args: &[&str], limits: Limits) -> Result<GitOutput, GitFailure> {
    debug!(cwd = %cwd.display(), ?args, "running git");
    let mut child = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(GitFailure::Spawn)?;

    let exchange = async {
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), STDERR_LIMIT));
        let stdout = read_capped(child.stdout.take(), limits.max_output)
            .await
            .map_err(GitFailure::Io)?;

        let status = child.wait().await.map_err(GitFailure::Io)?;
        if stdout.total > limits.max_output {
            return Err(GitFailure::OutputTooLarge {
                size: stdout.total,
            });
        }
        let stderr = match stderr_task.await {
            Ok(Ok(captured)) => captured.bytes,
            _ => Vec::new(),
        };

        Ok::<_, GitFailure>(GitOutput {
            code: status.code(),
            stdout: String::from_utf8_lossy(&stdout.bytes).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        })
    };

    match tokio::time::timeout(limits.timeout, exchange).await {
        Ok(result) => result,
        Err(_) => {
            warn!(cwd = %cwd.display(), ?args, "git command timed out");
            Err(GitFailure::TimedOut(limits.timeout))
        }
    }
}

/// Bytes kept from a stream and how many it produced in total.
#[derive(Debug, PartialEq)]
struct Captured {
    bytes: Vec<u8>,
    total: usize,
}

/// Keeps at most `limit` bytes. Anything past the limit is drained and only
/// counted, so `total` is the exact stream length.
async fn read_capped<R>(reader: Option<R>, limit: usize) -> io::Result<Captured>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let Some(mut reader) = reader else {
        return Ok(Captured { bytes, total: 0 });
    };

    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    (&mut reader).take(cap).read_to_end(&mut bytes).await?;
    let mut total = bytes.len();
    if total > limit {
        let rest = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
        total = total.saturating_add(usize::try_from(rest).unwrap_or(usize::MAX));
        bytes.truncate(limit);
    }
    Ok(Captured { bytes, total })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::{git, init_repo};

    #[tokio::test]
    async fn detects_repository_membership() {
        let repo = init_repo();
        let outside = tempfile::tempdir().unwrap();
        let git_cli = GitCli::new();

        assert!(git_cli.is_repository(&repo.path().join("lib.rs")).await);
        assert!(git_cli.is_repository(repo.path()).await);
        assert!(!git_cli.is_repository(&outside.path().join("notes.txt")).await);
        assert!(!git_cli.is_repository(Path::new("/definitely/not/here/file.rs")).await);
    }

    #[tokio::test]
    async fn resolves_repository_root_from_nested_path() {
        let repo = init_repo();
        fs::create_dir_all(repo.path().join("src/nested")).unwrap();
        let git_cli = GitCli::new();

        let root = git_cli
            .repository_root(&repo.path().join("src/nested"))
            .await
            .unwrap();
        assert_eq!(
            fs::canonicalize(root).unwrap(),
            fs::canonicalize(repo.path()).unwrap()
        );

        let outside = tempfile::tempdir().unwrap();
        assert_eq!(git_cli.repository_root(outside.path()).await, None);
    }

    #[tokio::test]
    async fn single_file_diff_covers_tracked_changes_only() {
        let repo = init_repo();
        let git_cli = GitCli::new();
        let tracked = repo.path().join("lib.rs");

        let clean = git_cli.single_file_diff(&tracked, 1024).await.unwrap();
        assert!(clean.is_blank());

        fs::write(&tracked, "fn answer() -> u32 {\n    42\n}\n").unwrap();
        let diff = git_cli.single_file_diff(&tracked, 1024).await.unwrap();
        assert!(diff.as_str().contains("-    41"));
        assert!(diff.as_str().contains("+    42"));

        let untracked = repo.path().join("scratch.rs");
        fs::write(&untracked, "fn scratch() {}\n").unwrap();
        let untracked_diff = git_cli.single_file_diff(&untracked, 1024).await.unwrap();
        assert!(untracked_diff.is_blank());
    }

    #[tokio::test]
    async fn single_file_diff_drops_oversized_output() {
        let repo = init_repo();
        let git_cli = GitCli::new();
        let tracked = repo.path().join("lib.rs");
        fs::write(&tracked, "fn answer() -> u32 {\n    42\n}\n").unwrap();

        let diff = git_cli.single_file_diff(&tracked, 16).await.unwrap();
        assert!(diff.is_blank());
    }

    #[tokio::test]
    async fn repository_diff_labels_each_section() {
        let repo = init_repo();
        let git_cli = GitCli::new();

        fs::write(repo.path().join("lib.rs"), "fn answer() -> u32 {\n    42\n}\n").unwrap();
        fs::write(repo.path().join("staged.rs"), "pub fn staged() {}\n").unwrap();
        git(repo.path(), &["add", "staged.rs"]);
        fs::write(repo.path().join("notes.md"), "todo\n").unwrap();

        let diff = git_cli
            .repository_diff(repo.path(), 1024 * 1024)
            .await
            .unwrap();
        let text = diff.as_str();
        assert!(text.starts_with("=== Unstaged Changes ===\n"));
        assert!(text.contains("=== Staged Changes ===\n"));
        assert!(text.contains("=== Untracked Files ===\nnotes.md\n"));
        assert!(text.contains("+pub fn staged() {}"));
    }

    #[tokio::test]
    async fn repository_diff_omits_empty_sections_and_rejects_oversize() {
        let repo = init_repo();
        let git_cli = GitCli::new();

        let clean = git_cli.repository_diff(repo.path(), 1024).await.unwrap();
        assert!(clean.is_blank());

        fs::write(repo.path().join("notes.md"), "todo\n").unwrap();
        let only_untracked = git_cli.repository_diff(repo.path(), 1024).await.unwrap();
        assert_eq!(only_untracked.as_str(), "=== Untracked Files ===\nnotes.md\n");

        let err = git_cli.repository_diff(repo.path(), 8).await.unwrap_err();
        assert!(matches!(err, AppError::DiffTooLarge { .. }));
    }

    #[tokio::test]
    async fn oversize_repository_diff_reports_its_full_size() {
        let repo = init_repo();
        let git_cli = GitCli::new();
        let rewrite: String = (0..400).map(|line| format!("// line {line}\n")).collect();
        fs::write(repo.path().join("lib.rs"), rewrite).unwrap();
        let expected = git(repo.path(), &["diff"]).len();
        assert!(expected > 4 * 100);

        let err = git_cli.repository_diff(repo.path(), 100).await.unwrap_err();
        match err {
            AppError::DiffTooLarge { size_mib, .. } => {
                assert_eq!((size_mib * 1024.0 * 1024.0).round() as usize, expected);
            }
            other => panic!("expected DiffTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_queries_fail_closed() {
        let repo = init_repo();
        let git_cli = GitCli::new();

        assert!(!git_cli.has_changes(repo.path()).await);
        assert_eq!(
            git_cli.changes_summary(repo.path()).await,
            ChangesSummary::empty()
        );

        fs::write(repo.path().join("lib.rs"), "fn answer() -> u32 {\n    42\n}\n").unwrap();
        fs::write(repo.path().join("notes.md"), "todo\n").unwrap();
        assert!(git_cli.has_changes(repo.path()).await);
        let summary = git_cli.changes_summary(repo.path()).await;
        assert_eq!(summary.modified, 1);
        assert_eq!(summary.untracked, 1);
        assert_eq!(summary.total(), 2);

        let outside = tempfile::tempdir().unwrap();
        assert!(!git_cli.has_changes(outside.path()).await);
        assert_eq!(
            git_cli.changes_summary(outside.path()).await,
            ChangesSummary::empty()
        );
    }

    #[tokio::test]
    async fn read_capped_reports_overflow() {
        let data: &[u8] = b"0123456789";
        assert_eq!(
            read_capped(Some(data), 10).await.unwrap(),
            Captured {
                bytes: data.to_vec(),
                total: 10
            }
        );
        assert_eq!(
            read_capped(Some(data), 4).await.unwrap(),
            Captured {
                bytes: b"0123".to_vec(),
                total: 10
            }
        );
        assert_eq!(
            read_capped::<&[u8]>(None, 4).await.unwrap(),
            Captured {
                bytes: Vec::new(),
                total: 0
            }
        );
    }
}
