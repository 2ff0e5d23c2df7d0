//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay between a modify event and the reload, so editors finish writing
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Config watcher that monitors file changes and sends reload notifications
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Create a new config watcher for the specified file
    pub async fn new(config_path: String) -> Result<(Self, Arc<AppConfig>)> {
        let (tx, rx) = mpsc::channel(10);

        let initial_config = AppConfig::load(&config_path)
            .await
            .context("Failed to load initial config")?;
        let initial_config = Arc::new(initial_config);

        let path_for_events = config_path.clone();

        // notify callbacks run on their own OS thread, not in Tokio context
        let runtime_handle = tokio::runtime::Handle::current();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) if matches!(event.kind, EventKind::Modify(_)) => {
                    debug!("Config file modified: {:?}", event.paths);

                    let config_path = path_for_events.clone();
                    let tx = tx.clone();

                    runtime_handle.spawn(async move {
                        tokio::time::sleep(RELOAD_DEBOUNCE).await;

                        match AppConfig::load(&config_path).await {
                            Ok(new_config) => {
                                info!("Configuration reloaded");
                                if let Err(e) = tx.send(new_config).await {
                                    error!("Failed to send config update: {}", e);
                                }
                            }
                            Err(e) => {
                                warn!("Failed to reload config (keeping old config): {:#}", e);
                            }
                        }
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path))?;

        info!("Config file watcher started for: {}", config_path);

        Ok((
            Self {
                _watcher: watcher,
                rx,
            },
            initial_config,
        ))
    }

    /// Wait for the next config update
    /// Returns None if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}
