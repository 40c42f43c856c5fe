use std::env;
use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::domain::intent::PresentChoice;
use crate::error::AppResult;
use crate::infra::clipboard::copy_text;
use crate::services::FolderPicker;
use crate::workflow::analysis::{PipelineOutcome, TriggerController};

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Workspace folders to choose from. Defaults to the current directory.
    pub folders: Vec<PathBuf>,
    /// Copy the result without asking: `message`, `full` or `none`.
    #[arg(long, value_parser = parse_copy_choice)]
    pub copy: Option<PresentChoice>,
}

/// Runs one manual analysis. Returns `false` when it ended in a failure the
/// presenter already reported.
pub async fn run(
    ctx: &AppContext,
    picker: &dyn FolderPicker,
    args: AnalyzeArgs,
    config: &AppConfig,
) -> AppResult<bool> {
    let folders = if args.folders.is_empty() {
        vec![env::current_dir()?]
    } else {
        args.folders
    };

    let controller = TriggerController::new(ctx.clone());
    match controller.run_manual(&folders, picker, config).await {
        PipelineOutcome::Presented { report, choice } => {
            if let Some(text) = choice.text_for(&report) {
                copy_text(config.clipboard_command.as_deref(), &text).await?;
                if config.clipboard_command.is_some() {
                    ctx.presenter.show_info("Copied to clipboard");
                }
            }
            Ok(true)
        }
        PipelineOutcome::Skipped { .. } | PipelineOutcome::Cancelled => Ok(true),
        PipelineOutcome::Failed { .. } => Ok(false),
    }
}

fn parse_copy_choice(value: &str) -> Result<PresentChoice, String> {
    value.parse()
}
