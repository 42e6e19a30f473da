use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tracing::{debug, error, info};

use super::SettingsHandle;

/// Hot-reloads the settings file on change. Dropping the watcher stops it.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
}

impl SettingsWatcher {
    /// Returns `Ok(None)` when there is no settings file to watch.
    pub fn start(handle: SettingsHandle) -> Result<Option<Self>> {
        let path = handle.path().to_path_buf();
        if !path.exists() {
            info!("No settings file at {}, hot reload disabled", path.display());
            return Ok(None);
        }

        // Watch the parent directory: editors usually replace the file instead of writing in place.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        let file_name = path.file_name().map(|name| name.to_os_string());

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("Settings watcher error: {}", e);
                    return;
                }
            };

            if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                return;
            }

            let touches_settings = event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
            if !touches_settings {
                return;
            }

            debug!("Settings file changed: {:?}", event.kind);
            if let Err(e) = handle.reload() {
                error!("Settings reload rejected, keeping previous settings: {:#}", e);
            }
        })
        .context("Failed to create settings watcher")?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        info!("✅ Settings watcher started for {}", path.display());
        Ok(Some(Self { _watcher: watcher }))
    }
}
