use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::intent::{IntentReport, PresentChoice};

/// Follow-up the status indicator offers when clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    GenerateCommitMessage,
}

/// Single status indicator shared by every pipeline run. Last write wins.
pub trait StatusSink: Send + Sync {
    fn set_busy(&self, text: &str);
    fn set_result(&self, text: &str, action: Option<StatusAction>);
    fn clear(&self);
}

#[async_trait]
pub trait IntentPresenter: Send + Sync {
    async fn show_result(&self, report: &IntentReport) -> PresentChoice;
    fn show_error(&self, message: &str);
    fn show_warning(&self, message: &str);
    fn show_info(&self, message: &str);
}

#[async_trait]
pub trait FolderPicker: Send + Sync {
    /// `None` means the user backed out.
    async fn pick(&self, folders: &[PathBuf]) -> Option<PathBuf>;
}
