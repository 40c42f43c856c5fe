use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::change::{ChangeSet, ChangesSummary};
use crate::error::AppResult;

/// Read-only queries against the repository holding the user's files.
///
/// "Not applicable" conditions (outside a repository, untracked file, clean
/// tree) resolve to `false`, `None` or an empty change set. Only real faults
/// are returned as errors.
#[async_trait]
pub trait VersionControlService: Send + Sync {
    async fn is_repository(&self, path: &Path) -> bool;
    async fn repository_root(&self, path: &Path) -> Option<PathBuf>;
    /// Working-tree diff of one tracked file. Oversized output is dropped.
    async fn single_file_diff(&self, path: &Path, max_bytes: usize) -> AppResult<ChangeSet>;
    /// Unstaged, staged and untracked sections. Oversized output is an error.
    async fn repository_diff(&self, root: &Path, max_bytes: usize) -> AppResult<ChangeSet>;
    async fn changes_summary(&self, root: &Path) -> ChangesSummary;
    async fn has_changes(&self, root: &Path) -> bool;
}
