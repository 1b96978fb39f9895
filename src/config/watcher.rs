//! Configuration file watcher for hot reload.
//!
//! Only the `waits` section is applied live; see `HubState::watch_waits`.
//!
//! The parent directory is watched rather than the file itself, so editors that
//! save by writing a new file and renaming it over the old one keep triggering reloads.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::HubConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<HubConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver of successfully reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<HubConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned watcher stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = self.path.file_name().map(OsString::from);
        let path = self.path.clone();
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_deref()) => reload(&path, &tx),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// A content change (write, create, rename onto) of the watched file.
fn touches(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    let relevant_kind = matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    relevant_kind
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<HubConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "Config reloaded");
            let _ = tx.send(config);
        }
        // Also hit mid-save, when the file is briefly truncated or absent.
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Config reload rejected, keeping current"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use std::fs;

    async fn next_matching(
        updates: &mut mpsc::UnboundedReceiver<HubConfig>,
        want: impl Fn(&HubConfig) -> bool,
    ) -> HubConfig {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let config = updates.recv().await.expect("watcher channel closed");
                if want(&config) {
                    return config;
                }
            }
        })
        .await
        .expect("no matching reload")
    }

    #[test]
    fn test_touches_only_the_watched_file() {
        let name = OsString::from("hub.toml");
        let event = |kind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        assert!(touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/hub/hub.toml"), Some(name.as_os_str())));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "/etc/hub/hub.toml"), Some(name.as_os_str())));
        assert!(!touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/hub/other.toml"), Some(name.as_os_str())));
        assert!(!touches(&event(EventKind::Remove(RemoveKind::File), "/etc/hub/hub.toml"), Some(name.as_os_str())));
    }

    #[tokio::test]
    async fn test_rewrite_delivers_reloaded_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.toml");
        fs::write(&path, "[waits]\ntimeout_ms = 30000\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();

        fs::write(&path, "[waits]\ntimeout_ms = 4000\ninterval_ms = 50\n").unwrap();
        let reloaded = next_matching(&mut updates, |c| c.waits.timeout_ms == 4_000).await;
        assert_eq!(reloaded.waits.interval_ms, 50);
    }

    #[tokio::test]
    async fn test_invalid_rewrite_is_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.toml");
        fs::write(&path, "").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();

        fs::write(&path, "[waits]\ninterval_ms = 0\n").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        fs::write(&path, "[waits]\ntimeout_ms = 5000\n").unwrap();

        next_matching(&mut updates, |c| {
            assert_ne!(c.waits.interval_ms, 0, "invalid config was delivered");
            c.waits.timeout_ms == 5_000
        })
        .await;
    }

    #[tokio::test]
    async fn test_replace_by_rename_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hub.toml");
        fs::write(&path, "").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(&path);
        let _watcher = watcher.run().unwrap();

        let staged = dir.path().join("hub.toml.tmp");
        fs::write(&staged, "[waits]\nimplicit_wait_ms = 750\n").unwrap();
        fs::rename(&staged, &path).unwrap();

        next_matching(&mut updates, |c| c.waits.implicit_wait_ms == 750).await;
    }
}
