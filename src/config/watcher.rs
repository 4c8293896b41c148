//! Config file watcher for hot reload.
//!
//! Accepted configs are published on an mpsc channel; the server swaps them
//! into its `SharedConfig`. A file that fails to parse or validate is logged
//! and the running config stays in place.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load;
use crate::config::schema::GatewayConfig;

/// Watches one TOML file and publishes each distinct valid config it yields.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
    last_published: Mutex<Option<GatewayConfig>>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end of its update channel.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
            last_published: Mutex::new(None),
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    ///
    /// The parent directory is watched rather than the file itself so that
    /// editors which save by rename are still picked up.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.path.clone();
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &target) => {
                    self.reload();
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }

    /// Load the file and publish it if it differs from the last published config.
    ///
    /// Returns whether an update was sent.
    pub fn reload(&self) -> bool {
        // Env overrides are re-applied so secrets survive a reload.
        let config = match load(Some(&self.path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Config reload rejected, keeping current configuration"
                );
                return false;
            }
        };

        let mut last = match self.last_published.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if last.as_ref() == Some(&config) {
            tracing::debug!(path = %self.path.display(), "Config file touched without changes");
            return false;
        }

        tracing::info!(path = %self.path.display(), "Config change detected, publishing reload");
        if self.update_tx.send(config.clone()).is_err() {
            tracing::warn!("Config update receiver dropped");
            return false;
        }
        *last = Some(config);
        true
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == target.file_name())
}
