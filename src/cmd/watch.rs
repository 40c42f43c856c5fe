use std::env;
use std::future::Future;
use std::path::PathBuf;

use clap::Args;
use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::workflow::analysis::TriggerController;

const EVENT_BUFFER: usize = 256;

#[derive(Args, Debug, Clone)]
pub struct WatchArgs {
    /// Folder to watch for saved files. Defaults to the current directory.
    pub folder: Option<PathBuf>,
}

/// Treats every file write under the folder as a save and runs the debounced
/// analysis until Ctrl-C.
pub async fn run(ctx: &AppContext, args: WatchArgs, api_url: Option<String>) -> AppResult<()> {
    let folder = match args.folder {
        Some(folder) => folder,
        None => env::current_dir()?,
    };
    let folder = tokio::fs::canonicalize(&folder).await?;
    let config = AppConfig::load()?.with_api_url(api_url.clone())?;

    let (tx, rx) = mpsc::channel::<PathBuf>(EVENT_BUFFER);
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| match res {
            Ok(event) if is_save(&event.kind) => {
                for path in event.paths {
                    if let Err(err) = tx.try_send(path) {
                        debug!("save notification dropped: {err}");
                    }
                }
            }
            Ok(_) => {}
            Err(err) => warn!("file watcher error: {err}"),
        },
        Config::default(),
    )
    .map_err(|err| AppError::Configuration(format!("failed to create file watcher: {err}")))?;

    watcher
        .watch(&folder, RecursiveMode::Recursive)
        .map_err(|err| {
            AppError::Configuration(format!("failed to watch {}: {err}", folder.display()))
        })?;

    info!(folder = %folder.display(), "watching for saves");
    eprintln!(
        "Watching {} for saved files. Press Ctrl-C to stop.",
        folder.display()
    );

    let controller = TriggerController::new(ctx.clone());
    let reload = || AppConfig::load().and_then(|fresh| fresh.with_api_url(api_url.clone()));
    let scheduled = watch_loop(&controller, rx, tokio::signal::ctrl_c(), config, reload).await;
    debug!(scheduled, "watch loop finished");

    controller.shutdown();
    drop(watcher);
    Ok(())
}

/// Feeds save notifications to the controller until `shutdown` resolves or
/// the channel closes. Returns how many saves were scheduled.
async fn watch_loop<S, R>(
    controller: &TriggerController,
    mut saves: mpsc::Receiver<PathBuf>,
    shutdown: S,
    mut config: AppConfig,
    reload: R,
) -> usize
where
    S: Future,
    R: Fn() -> AppResult<AppConfig>,
{
    tokio::pin!(shutdown);
    let mut scheduled = 0;

    loop {
        tokio::select! {
            received = saves.recv() => {
                let Some(path) = received else {
                    break;
                };
                if tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(true) {
                    continue;
                }
                // the snapshot is re-read per save so edits to the config file apply
                match reload() {
                    Ok(fresh) => config = fresh,
                    Err(err) => warn!("keeping previous configuration: {err}"),
                }
                if controller.handle_save(path, config.clone()) {
                    scheduled += 1;
                }
            }
            _ = &mut shutdown => {
                info!("shutting down watcher");
                break;
            }
        }
    }
    scheduled
}

fn is_save(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::http::StatusCode;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};

    use super::*;
    use crate::infra::classifier::HttpIntentClassifier;
    use crate::infra::git::GitCli;
    use crate::infra::terminal::TerminalUi;
    use crate::test_support::{init_repo, spawn_classifier};

    fn controller() -> TriggerController {
        let ui = Arc::new(TerminalUi::new(false, None));
        TriggerController::new(AppContext::new(
            Arc::new(GitCli::new()),
            Arc::new(HttpIntentClassifier::new().unwrap()),
            ui.clone(),
            ui,
        ))
    }

    fn quick(url: &str) -> AppConfig {
        AppConfig {
            debounce_delay_ms: 10,
            ..AppConfig::default()
        }
        .with_api_url(Some(url.to_string()))
        .unwrap()
    }

    #[tokio::test]
    async fn reloads_config_per_save_and_skips_directories() {
        let repo = init_repo();
        let file = repo.path().join("lib.rs");
        fs::write(&file, "fn answer() -> u32 {\n    42\n}\n").unwrap();
        let (url, received) =
            spawn_classifier(StatusCode::OK, r#"{"intent":"Intent: Fix\nMessage: correct answer"}"#)
                .await;
        let watching = controller();

        let (tx, rx) = mpsc::channel(8);
        tx.send(repo.path().to_path_buf()).await.unwrap();
        tx.send(file).await.unwrap();
        drop(tx);

        // the initial snapshot is disabled; only the reloaded one lets the save through
        let stale = AppConfig {
            enabled: false,
            ..AppConfig::default()
        };
        let scheduled = watch_loop(
            &watching,
            rx,
            std::future::pending::<()>(),
            stale,
            || Ok(quick(&url)),
        )
        .await;
        assert_eq!(scheduled, 1);

        for _ in 0..100 {
            if !received.lock().unwrap().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert!(bodies[0]["diff"].as_str().unwrap().contains("+    42"));
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_config() {
        let repo = init_repo();
        let watching = controller();
        let (tx, rx) = mpsc::channel(8);
        tx.send(repo.path().join("lib.rs")).await.unwrap();
        drop(tx);

        let previous = AppConfig {
            debounce_delay_ms: 60_000,
            ..AppConfig::default()
        };
        let scheduled = watch_loop(&watching, rx, std::future::pending::<()>(), previous, || {
            Err(AppError::Configuration("broken config file".to_string()))
        })
        .await;

        assert_eq!(scheduled, 1);
        watching.shutdown();
    }

    #[tokio::test]
    async fn shutdown_signal_stops_the_loop() {
        let watching = controller();
        let (_tx, rx) = mpsc::channel::<PathBuf>(8);

        let scheduled = tokio::time::timeout(
            Duration::from_secs(5),
            watch_loop(&watching, rx, async {}, AppConfig::default(), || {
                Ok(AppConfig::default())
            }),
        )
        .await
        .unwrap();

        assert_eq!(scheduled, 0);
    }

    #[test]
    fn content_changes_count_as_saves() {
        assert!(is_save(&EventKind::Create(CreateKind::File)));
        assert!(is_save(&EventKind::Modify(ModifyKind::Data(DataChange::Content))));
        assert!(is_save(&EventKind::Modify(ModifyKind::Name(RenameMode::To))));
        assert!(!is_save(&EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::Permissions
        ))));
        assert!(!is_save(&EventKind::Remove(RemoveKind::File)));
    }
}
