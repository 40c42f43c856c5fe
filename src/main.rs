mod cmd;
mod config;
mod context;
mod domain;
mod error;
mod infra;
mod services;
#[cfg(test)]
mod test_support;
mod workflow;

use std::io::{self, IsTerminal};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cmd::analyze::{self, AnalyzeArgs};
use crate::cmd::config::{self as config_cmd, ConfigArgs};
use crate::cmd::watch::{self, WatchArgs};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::AppResult;
use crate::infra::classifier::HttpIntentClassifier;
use crate::infra::git::GitCli;
use crate::infra::terminal::TerminalUi;

#[derive(Parser)]
#[command(
    name = "commitect",
    author,
    version,
    about = "Detect commit intent from working-tree changes"
)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override the classifier endpoint for this run.
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a folder and classify each saved file's diff.
    Watch(WatchArgs),
    /// Classify every change in the repository and suggest a commit message.
    Analyze(AnalyzeArgs),
    /// Manage CLI configuration.
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Config(args) => {
            config_cmd::run(args.command)?;
            Ok(())
        }
        Commands::Watch(args) => {
            let ui = Arc::new(TerminalUi::new(false, None));
            let context = build_context(ui)?;
            watch::run(&context, args, cli.api_url).await
        }
        Commands::Analyze(args) => {
            let config = AppConfig::load()?.with_api_url(cli.api_url)?;
            let ui = Arc::new(TerminalUi::new(io::stdin().is_terminal(), args.copy));
            let context = build_context(ui.clone())?;
            if !analyze::run(&context, ui.as_ref(), args, &config).await? {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn build_context(ui: Arc<TerminalUi>) -> AppResult<AppContext> {
    let version_control = Arc::new(GitCli::new());
    let classifier = Arc::new(HttpIntentClassifier::new()?);
    Ok(AppContext::new(version_control, classifier, ui.clone(), ui))
}

fn init_logging(verbose: bool) {
    // RUST_LOG directives are kept; --verbose adds debug on top
    let filter = if verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}
