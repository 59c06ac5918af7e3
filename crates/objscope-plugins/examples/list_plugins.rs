//! Discover plugins in the working directory's plugin subdirectory and
//! print the resulting registry.
//!
//! Usage: `cargo run --example list_plugins [plugin-dir]`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use objscope_plugins::{discover_plugins, HostUi, MessageSeverity, PluginManagerConfig};

struct StdioUi;

impl HostUi for StdioUi {
    fn message_box(&self, severity: MessageSeverity, text: &str) {
        eprintln!("[{severity:?}] {text}");
    }

    fn confirm(&self, _text: &str) -> bool {
        false
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cwd = std::env::current_dir().context("query working directory")?;
    let mut config = PluginManagerConfig::load_or_default(Path::new("plugins.json"));
    if let Some(dir) = std::env::args().nth(1) {
        config.plugin_dir = PathBuf::from(dir);
    }
    println!("scanning {}", cwd.join(&config.plugin_dir).display());

    let ui: Arc<dyn HostUi> = Arc::new(StdioUi);
    let (registry, report) = discover_plugins(&config, &ui);

    println!("{} plugin(s) registered", registry.len());
    for entry in registry.iter() {
        println!(
            "  {:#06x}  {:?}  {}  ({})",
            entry.menu_id(),
            entry.kind(),
            entry.description(),
            entry.file_name()
        );
    }
    if !report.rejected.is_empty() {
        println!("{} file(s) failed the plugin check", report.rejected.len());
    }
    if !report.skipped.is_empty() {
        println!("{} module(s) had no plugin entry point", report.skipped.len());
    }
    if !report.failed.is_empty() {
        println!("{} module(s) failed to initialize", report.failed.len());
    }
    if report.truncated {
        println!("plugin limit reached, some files were not examined");
    }
    Ok(())
}
