use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;

use clap::{Args, Subcommand};

use crate::config::{AppConfig, StoredConfig, config_file_path};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration and the values in effect.
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring commitect.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt("Classifier API URL", &mut cfg.api_url)?;
    apply_parsed("Request timeout (ms)", &mut cfg.timeout_ms)?;
    apply_parsed("Analyze on save (true/false)", &mut cfg.enabled)?;
    apply_parsed("Debounce delay (ms)", &mut cfg.debounce_delay_ms)?;
    apply_parsed("Show status line (true/false)", &mut cfg.show_status_bar)?;
    apply_parsed(
        "Allow self-signed certificates, development only (true/false)",
        &mut cfg.allow_insecure_ssl,
    )?;
    apply_prompt(
        "Clipboard command (e.g. pbcopy, xclip -selection clipboard)",
        &mut cfg.clipboard_command,
    )?;

    AppConfig::resolve(&cfg, |_| None)?;
    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let effective = AppConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!(
        "API URL: {} (effective: {})",
        display_value(&cfg.api_url),
        effective.api_url
    );
    println!(
        "Timeout (ms): {} (effective: {})",
        display_value(&cfg.timeout_ms),
        effective.timeout_ms
    );
    println!(
        "Analyze on save: {} (effective: {})",
        display_value(&cfg.enabled),
        effective.enabled
    );
    println!(
        "Debounce delay (ms): {} (effective: {})",
        display_value(&cfg.debounce_delay_ms),
        effective.debounce_delay_ms
    );
    println!(
        "Show status line: {} (effective: {})",
        display_value(&cfg.show_status_bar),
        effective.show_status_bar
    );
    println!(
        "Allow insecure SSL: {} (effective: {})",
        display_value(&cfg.allow_insecure_ssl),
        effective.allow_insecure_ssl
    );
    println!(
        "Clipboard command: {}",
        display_value(&cfg.clipboard_command)
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    match prompt(field, target.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn apply_parsed<T>(field: &str, target: &mut Option<T>) -> AppResult<()>
where
    T: FromStr + Display,
{
    let current = target.as_ref().map(ToString::to_string);
    match prompt(field, current.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => {
            let parsed = value.parse::<T>().map_err(|_| {
                AppError::Configuration(format!("invalid value for {field}: '{value}'"))
            })?;
            *target = Some(parsed);
        }
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to use the default): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::parse(&input))
}

fn display_value<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "<not set>".to_string())
}

#[derive(Debug, PartialEq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            PromptAction::Keep
        } else if trimmed == "-" {
            PromptAction::Clear
        } else {
            PromptAction::Set(trimmed.to_string())
        }
    }
}
