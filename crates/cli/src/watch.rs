use anyhow::Result;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use storage::{DatasetStore, ReloadOutcome};
use tracing::{debug, info, warn};

/// Reloads the store whenever its source file changes. Each reload waits
/// `settle` and re-reads before swapping. The returned watcher must be kept
/// alive for as long as reloads are wanted.
pub fn watch_dataset(
    store: Arc<DatasetStore>,
    poll_interval: Duration,
    settle: Duration,
) -> Result<RecommendedWatcher> {
    let path = store.path().to_path_buf();
    // Watch the directory: editors often replace the file instead of writing in place.
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file_name = path.file_name().map(OsStr::to_os_string);

    let handler_store = Arc::clone(&store);
    let mut watcher = RecommendedWatcher::new(
        move |event: notify::Result<Event>| match event {
            Ok(ev) => {
                if !is_relevant(&ev, file_name.as_deref()) {
                    return;
                }
                debug!("dataset change detected: {:?}", ev.kind);
                match handler_store.reload_settled(settle) {
                    ReloadOutcome::Replaced { records } => {
                        info!("Reloaded dataset after change ({} records)", records)
                    }
                    ReloadOutcome::Unchanged => debug!("dataset content unchanged"),
                    ReloadOutcome::Unsettled => debug!("dataset still being written"),
                    ReloadOutcome::Failed(e) => warn!("reload after change failed: {}", e),
                }
            }
            Err(e) => warn!("watch error: {:?}", e),
        },
        notify::Config::default().with_poll_interval(poll_interval),
    )?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!("Watching {} for changes", path.display());
    Ok(watcher)
}

pub fn is_relevant(event: &Event, file_name: Option<&OsStr>) -> bool {
    let kind_matches = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    kind_matches
        && file_name.is_some()
        && event.paths.iter().any(|p| p.file_name() == file_name)
}
