//! Startup discovery pass.
//!
//! Runs once, off the UI thread: scan the plugin subdirectory, probe each
//! candidate for the authenticity marker, load and initialize survivors,
//! and hand the populated registry back over a channel. After the handoff
//! nobody writes the registry again until teardown, so readers need no
//! locking.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver};
use tracing::{debug, error, info, warn};

use crate::config::PluginManagerConfig;
use crate::host::{HostUi, MessageSeverity};
use crate::load::{load_candidate, LoadOutcome};
use crate::registry::PluginRegistry;
use crate::validate::has_plugin_description;

/// What one discovery pass saw, for logging and diagnostics.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// File names registered, in registry order.
    pub loaded: Vec<String>,
    /// Candidates that failed the authenticity check; never loaded.
    pub rejected: Vec<PathBuf>,
    /// Candidates without the entry export; unloaded again, not an error.
    pub skipped: Vec<PathBuf>,
    /// Candidates that loaded but whose init failed or faulted.
    pub failed: Vec<PathBuf>,
    /// Enumeration stopped early at the configured maximum.
    pub truncated: bool,
}

/// Scan, validate, and load plugins synchronously on the current thread.
pub fn discover_plugins(
    config: &PluginManagerConfig,
    ui: &Arc<dyn HostUi>,
) -> (PluginRegistry, DiscoveryReport) {
    let mut registry = PluginRegistry::new(config.max_plugins);
    let mut report = DiscoveryReport::default();

    let entries = match std::fs::read_dir(&config.plugin_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                dir = %config.plugin_dir.display(),
                %err,
                "plugin directory is unreadable, discovery ends"
            );
            return (registry, report);
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_plugin_library_name(path))
        .collect();
    // Directory iteration order is OS-dependent; sort so menu placement is
    // stable across runs.
    candidates.sort();

    for path in candidates {
        if registry.is_full() {
            info!(max = config.max_plugins, "plugin limit reached, enumeration stopped");
            report.truncated = true;
            break;
        }

        match has_plugin_description(&path) {
            Ok(true) => {}
            Ok(false) | Err(_) => {
                info!(file = %path.display(), "file is not a valid plugin");
                report.rejected.push(path);
                continue;
            }
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match load_candidate(&path) {
            Err(err) => {
                warn!(file = %path.display(), %err, "candidate failed to load");
                report.failed.push(path);
            }
            Ok(LoadOutcome::MissingEntry) => {
                debug!(file = %path.display(), "candidate skipped, no entry export");
                report.skipped.push(path);
            }
            Ok(LoadOutcome::InitRejected) => {
                ui.message_box(
                    MessageSeverity::Error,
                    &format!(
                        "There was an error while initializing the plugin\n{file_name}\n\nThis plugin will be skipped."
                    ),
                );
                report.failed.push(path);
            }
            Ok(LoadOutcome::InitFaulted(fault)) => {
                ui.message_box(
                    MessageSeverity::Error,
                    &format!(
                        "There was an error ({fault}) while initializing the plugin\n{file_name}\n\nThis plugin will be skipped."
                    ),
                );
                report.failed.push(path);
            }
            Ok(LoadOutcome::Loaded {
                descriptor,
                library,
            }) => {
                let menu_id = registry.insert_loaded(descriptor, library, file_name.clone());
                info!(file = %file_name, menu_id, "plugin registered");
                report.loaded.push(file_name);
            }
        }
    }

    (registry, report)
}

fn is_plugin_library_name(path: &Path) -> bool {
    path.extension().and_then(OsStr::to_str) == Some(std::env::consts::DLL_EXTENSION)
}

/// Handle to a discovery pass running on its worker thread.
pub struct DiscoveryTask {
    receiver: Receiver<(PluginRegistry, DiscoveryReport)>,
}

impl DiscoveryTask {
    /// Block until the pass finishes. A worker that died without reporting
    /// yields an empty registry rather than an error; the UI must come up
    /// either way.
    pub fn wait(self) -> (PluginRegistry, DiscoveryReport) {
        match self.receiver.recv() {
            Ok(result) => result,
            Err(_) => {
                error!("discovery worker exited without a result");
                (PluginRegistry::new(0), DiscoveryReport::default())
            }
        }
    }

    /// Non-blocking poll, for hosts that keep pumping events while the
    /// worker runs.
    pub fn try_finish(&self) -> Option<(PluginRegistry, DiscoveryReport)> {
        self.receiver.try_recv().ok()
    }
}

/// Start the discovery pass on a dedicated worker thread.
pub fn spawn_discovery(config: PluginManagerConfig, ui: Arc<dyn HostUi>) -> DiscoveryTask {
    let (sender, receiver) = bounded(1);
    let spawn_result = thread::Builder::new()
        .name("plugin-discovery".into())
        .spawn(move || {
            let result = discover_plugins(&config, &ui);
            let _ = sender.send(result);
        });
    if let Err(err) = spawn_result {
        error!(%err, "failed to spawn the discovery worker");
    }
    DiscoveryTask { receiver }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use objscope_plugin_api::OBJSCOPE_PLUGIN_FILE_DESCRIPTION;

    use crate::host::MessageSeverity;

    struct RecordingUi {
        messages: Mutex<Vec<String>>,
    }

    impl RecordingUi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                messages: Mutex::new(Vec::new()),
            })
        }
    }

    impl HostUi for RecordingUi {
        fn message_box(&self, _severity: MessageSeverity, text: &str) {
            self.messages.lock().expect("ui mutex").push(text.to_string());
        }

        fn confirm(&self, _text: &str) -> bool {
            false
        }
    }

    fn marker_bytes() -> Vec<u8> {
        OBJSCOPE_PLUGIN_FILE_DESCRIPTION
            .encode_utf16()
            .flat_map(u16::to_ne_bytes)
            .collect()
    }

    fn library_name(stem: &str) -> String {
        format!("{stem}.{}", std::env::consts::DLL_EXTENSION)
    }

    fn config_for(dir: &Path) -> PluginManagerConfig {
        PluginManagerConfig {
            plugin_dir: dir.to_path_buf(),
            max_plugins: 4,
        }
    }

    #[test]
    fn missing_directory_yields_empty_registry() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let ui: Arc<dyn HostUi> = RecordingUi::new();
        let config = config_for(&dir.path().join("does-not-exist"));

        let (registry, report) = discover_plugins(&config, &ui);
        assert!(registry.is_empty());
        assert!(report.loaded.is_empty());
    }

    #[test]
    fn unmarked_files_are_rejected_without_loading() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join(library_name("random")), b"some unrelated library")
            .expect("write junk library");
        std::fs::write(dir.path().join("notes.txt"), b"not a library at all")
            .expect("write text file");

        let ui: Arc<dyn HostUi> = RecordingUi::new();
        let (registry, report) = discover_plugins(&config_for(dir.path()), &ui);

        assert!(registry.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(report.rejected[0].ends_with(library_name("random")));
        // The text file never even counted as a candidate.
        assert!(report.skipped.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn marked_but_unloadable_candidate_lands_in_failed() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let mut bytes = b"leading junk ".to_vec();
        bytes.extend_from_slice(&marker_bytes());
        std::fs::write(dir.path().join(library_name("marked_text")), &bytes)
            .expect("write marked non-library");

        let ui: Arc<dyn HostUi> = RecordingUi::new();
        let (registry, report) = discover_plugins(&config_for(dir.path()), &ui);

        assert!(registry.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(report.rejected.is_empty());
    }

    #[test]
    fn worker_thread_hands_the_registry_back() {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join(library_name("random")), b"unrelated")
            .expect("write junk library");

        let ui = RecordingUi::new();
        let task = spawn_discovery(config_for(dir.path()), ui);
        let (registry, report) = task.wait();
        assert!(registry.is_empty());
        assert_eq!(report.rejected.len(), 1);
    }
}
