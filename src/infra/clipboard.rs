use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Hands `text` to the configured clipboard command on stdin, or prints it
/// when no command is configured.
pub async fn copy_text(command: Option<&str>, text: &str) -> AppResult<()> {
    let Some(command) = command.map(str::trim).filter(|c| !c.is_empty()) else {
        println!("{text}");
        return Ok(());
    };

    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| AppError::Configuration("clipboard command is empty".to_string()))?;

    debug!(program, "copying to clipboard");
    let mut child = Command::new(program)
        .args(parts)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            AppError::Configuration(format!("failed to run clipboard command '{command}': {err}"))
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // a command that exits without reading is judged by its status below
        if let Err(err) = stdin.write_all(text.as_bytes()).await {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(err.into());
            }
        }
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        return Err(AppError::Configuration(format!(
            "clipboard command '{command}' failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}
