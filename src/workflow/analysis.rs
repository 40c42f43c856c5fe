use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::change::ChangeSet;
use crate::domain::filter::should_process;
use crate::domain::intent::{IntentReport, PresentChoice};
use crate::error::{AppError, AppResult};
use crate::services::{FolderPicker, StatusAction};
use crate::workflow::debounce::Debouncer;

const SAVE_FAILURE: &str = "Failed to detect commit intent";
const MANUAL_FAILURE: &str = "Failed to generate commit message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Checking,
    Diffing,
    Classifying,
    Presenting,
}

/// How one trigger ended. Every variant leaves the controller idle again.
#[derive(Debug)]
pub enum PipelineOutcome {
    Presented {
        report: IntentReport,
        choice: PresentChoice,
    },
    /// Nothing to analyze; `reason` is not a fault.
    Skipped { stage: Stage, reason: AppError },
    Cancelled,
    Failed { stage: Stage, error: AppError },
}

/// Drives save-triggered and manual analyses through
/// check → diff → classify → present.
#[derive(Clone)]
pub struct TriggerController {
    ctx: AppContext,
    debouncer: Debouncer,
}

impl TriggerController {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            debouncer: Debouncer::new(),
        }
    }

    /// Schedules analysis of a saved file. Returns whether a timer was
    /// (re)started; disabled configs and filtered paths are ignored.
    pub fn handle_save(&self, path: PathBuf, config: AppConfig) -> bool {
        if !config.enabled {
            debug!("commit intent detection is disabled");
            return false;
        }
        if !should_process(&path) {
            return false;
        }

        let controller = self.clone();
        self.debouncer
            .schedule(config.debounce_delay(), async move {
                let outcome = controller.run_save_pipeline(&path, &config).await;
                debug!(?outcome, "save-triggered analysis finished");
            });
        true
    }

    pub async fn run_save_pipeline(&self, path: &Path, config: &AppConfig) -> PipelineOutcome {
        let mut run = Run::new(&self.ctx, config);
        let result = run.analyze_file(path).await;
        run.finish(result, SAVE_FAILURE)
    }

    pub async fn run_manual(
        &self,
        folders: &[PathBuf],
        picker: &dyn FolderPicker,
        config: &AppConfig,
    ) -> PipelineOutcome {
        if !config.enabled {
            let reason = "CommiTect is disabled. Enable it in settings.";
            self.ctx.presenter.show_warning(reason);
            return PipelineOutcome::Skipped {
                stage: Stage::Idle,
                reason: AppError::Configuration(reason.to_string()),
            };
        }

        let folder = match folders {
            [] => {
                let message = "No workspace folder is open. Please open a folder or workspace.";
                self.ctx.presenter.show_error(message);
                return PipelineOutcome::Failed {
                    stage: Stage::Idle,
                    error: AppError::Configuration(message.to_string()),
                };
            }
            [only] => only.clone(),
            many => match picker.pick(many).await {
                Some(folder) => folder,
                None => {
                    debug!("folder selection cancelled");
                    return PipelineOutcome::Cancelled;
                }
            },
        };

        info!(folder = %folder.display(), "analyzing workspace");
        let mut run = Run::new(&self.ctx, config);
        let result = run.analyze_repository(&folder).await;
        run.finish(result, MANUAL_FAILURE)
    }

    /// Drops any save that has not fired yet and clears the status.
    pub fn shutdown(&self) {
        if self.debouncer.cancel_pending() {
            debug!("cancelled pending analysis on shutdown");
        }
        self.ctx.status.clear();
    }
}

/// One pass through the pipeline, tracking the stage it reached.
struct Run<'a> {
    ctx: &'a AppContext,
    config: &'a AppConfig,
    stage: Stage,
}

impl<'a> Run<'a> {
    fn new(ctx: &'a AppContext, config: &'a AppConfig) -> Self {
        Self {
            ctx,
            config,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "pipeline stage");
        self.stage = stage;
    }

    fn busy(&self, text: &str) {
        if self.config.show_status_bar {
            self.ctx.status.set_busy(text);
        }
    }

    fn skip(&self, reason: AppError) -> PipelineOutcome {
        debug!(stage = ?self.stage, %reason, "nothing to analyze");
        self.ctx.status.clear();
        PipelineOutcome::Skipped {
            stage: self.stage,
            reason,
        }
    }

    async fn analyze_file(&mut self, path: &Path) -> AppResult<PipelineOutcome> {
        let ctx = self.ctx;
        let vcs = &ctx.version_control;

        self.enter(Stage::Checking);
        self.busy("Analyzing commit intent...");
        if !vcs.is_repository(path).await {
            return Ok(self.skip(AppError::NotARepository(path.display().to_string())));
        }

        self.enter(Stage::Diffing);
        let changes = vcs
            .single_file_diff(path, self.config.max_diff_bytes)
            .await?;
        if changes.is_blank() {
            return Ok(self.skip(AppError::NoChanges(path.display().to_string())));
        }
        debug!(bytes = changes.len(), "file diff retrieved");

        self.classify_and_present(&changes).await
    }

    async fn analyze_repository(&mut self, folder: &Path) -> AppResult<PipelineOutcome> {
        let ctx = self.ctx;
        let vcs = &ctx.version_control;
        let presenter = &ctx.presenter;

        self.enter(Stage::Checking);
        self.busy("Checking repository...");
        let Some(root) = vcs.repository_root(folder).await else {
            presenter.show_warning("This is not a Git repository. Initialize Git first.");
            return Ok(self.skip(AppError::NotARepository(folder.display().to_string())));
        };
        debug!(root = %root.display(), "git repository found");

        if !vcs.has_changes(&root).await {
            presenter.show_info("No changes detected in the repository. Nothing to commit!");
            return Ok(self.skip(AppError::NoChanges(root.display().to_string())));
        }

        let summary = vcs.changes_summary(&root).await;
        info!(?summary, "changes summary");

        self.enter(Stage::Diffing);
        self.busy(&format!("Analyzing {} file(s)...", summary.total()));
        let changes = vcs
            .repository_diff(&root, self.config.max_diff_bytes)
            .await?;
        if changes.is_blank() {
            presenter.show_info("No diff content available. All changes may be binary files.");
            return Ok(self.skip(AppError::NoChanges(root.display().to_string())));
        }
        debug!(bytes = changes.len(), "repository diff retrieved");

        self.busy("Generating commit message...");
        self.classify_and_present(&changes).await
    }

    async fn classify_and_present(&mut self, changes: &ChangeSet) -> AppResult<PipelineOutcome> {
        if changes.exceeds(self.config.max_diff_bytes) {
            return Err(AppError::diff_too_large(
                changes.len(),
                self.config.max_diff_bytes,
            ));
        }

        self.enter(Stage::Classifying);
        let raw = self
            .ctx
            .classifier
            .classify(changes, &self.config.classifier_settings())
            .await?;
        info!(intent = %raw, "detected intent");

        self.enter(Stage::Presenting);
        let report = IntentReport::from_raw(raw);
        let choice = self.ctx.presenter.show_result(&report).await;
        if self.config.show_status_bar {
            self.ctx.status.set_result(
                &report.headline(),
                Some(StatusAction::GenerateCommitMessage),
            );
        }

        Ok(PipelineOutcome::Presented { report, choice })
    }

    fn finish(&self, result: AppResult<PipelineOutcome>, context: &str) -> PipelineOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(error) => {
                error!(stage = ?self.stage, "{context}: {error}");
                self.ctx.presenter.show_error(&format!("{context}: {error}"));
                self.ctx.status.clear();
                PipelineOutcome::Failed {
                    stage: self.stage,
                    error,
                }
            }
        }
    }
}
