use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::intent::{IntentReport, PresentChoice};
use crate::services::{FolderPicker, IntentPresenter, StatusAction, StatusSink};

/// Terminal stand-in for the editor's status bar, notifications and quick pick.
/// Status goes to stderr so stdout only carries results.
pub struct TerminalUi {
    interactive: bool,
    preset_choice: Option<PresentChoice>,
    status: Mutex<Option<String>>,
}

impl TerminalUi {
    pub fn new(interactive: bool, preset_choice: Option<PresentChoice>) -> Self {
        Self {
            interactive,
            preset_choice,
            status: Mutex::new(None),
        }
    }

    fn replace_status(&self, text: Option<&str>) -> bool {
        let mut current = self.status.lock().unwrap_or_else(|p| p.into_inner());
        let changed = current.as_deref() != text;
        *current = text.map(str::to_string);
        changed
    }
}

impl StatusSink for TerminalUi {
    fn set_busy(&self, text: &str) {
        if self.replace_status(Some(text)) {
            eprintln!("… {text}");
        }
    }

    fn set_result(&self, text: &str, action: Option<StatusAction>) {
        if !self.replace_status(Some(text)) {
            return;
        }
        match action {
            Some(StatusAction::GenerateCommitMessage) => {
                eprintln!("✔ {text} (run `commitect analyze` for a commit message)")
            }
            None => eprintln!("✔ {text}"),
        }
    }

    fn clear(&self) {
        if self.replace_status(None) {
            debug!("status cleared");
        }
    }
}

#[async_trait]
impl IntentPresenter for TerminalUi {
    async fn show_result(&self, report: &IntentReport) -> PresentChoice {
        match &report.parsed {
            Some(parsed) => {
                println!("Intent: {}", parsed.kind);
                println!("Message: {}", parsed.message);
            }
            None => println!("{}", report.headline()),
        }

        if let Some(choice) = self.preset_choice {
            return choice;
        }
        if !self.interactive {
            return PresentChoice::None;
        }

        let answer = prompt_line("Copy [m]essage, [f]ull text, or Enter to skip: ").await;
        answer
            .as_deref()
            .and_then(|answer| answer.parse().ok())
            .unwrap_or(PresentChoice::None)
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {message}");
    }

    fn show_warning(&self, message: &str) {
        eprintln!("Warning: {message}");
    }

    fn show_info(&self, message: &str) {
        println!("{message}");
    }
}

#[async_trait]
impl FolderPicker for TerminalUi {
    async fn pick(&self, folders: &[PathBuf]) -> Option<PathBuf> {
        if !self.interactive {
            self.show_warning(&unattended_pick_warning(folders.len()));
            return None;
        }
        eprintln!("Select a workspace folder to analyze:");
        for (index, folder) in folders.iter().enumerate() {
            let name = folder
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| folder.display().to_string());
            eprintln!("  {}) {name}  {}", index + 1, folder.display());
        }

        let answer = prompt_line("Folder number (Enter to cancel): ").await?;
        let index = answer.trim().parse::<usize>().ok()?;
        folders.get(index.checked_sub(1)?).cloned()
    }
}

fn unattended_pick_warning(count: usize) -> String {
    format!(
        "{count} workspace folders given but stdin is not a terminal; pass exactly one folder to analyze."
    )
}

/// Reads one trimmed line from stdin without blocking the runtime.
async fn prompt_line(question: &str) -> Option<String> {
    let question = question.to_string();
    let read = tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{question}")?;
        stderr.flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    })
    .await;

    match read {
        Ok(Ok(line)) if !line.is_empty() => Some(line),
        Ok(Ok(_)) => None,
        Ok(Err(err)) => {
            debug!("could not read answer: {err}");
            None
        }
        Err(err) => {
            debug!("prompt task failed: {err}");
            None
        }
    }
}
