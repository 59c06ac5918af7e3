//! Read-only menu models over the registry. Rendering is the embedder's
//! job; no plugin code runs here.

use objscope_plugin_api::ObPluginKind;

use crate::registry::PluginRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Separator,
    Item { menu_id: u32, title: String },
}

/// Entries for the static "Plugins" menu: every general-purpose plugin, in
/// registry order.
pub fn static_menu_entries(registry: &PluginRegistry) -> Vec<MenuEntry> {
    registry
        .iter()
        .filter(|entry| entry.kind() == Some(ObPluginKind::General))
        .map(|entry| MenuEntry::Item {
            menu_id: entry.menu_id(),
            title: entry.description(),
        })
        .collect()
}

/// Context-menu entries for a focused item of `object_type`: one item per
/// context-sensitive plugin whose declared type matches exactly, preceded by
/// a single shared separator.
pub fn context_menu_entries(registry: &PluginRegistry, object_type: u32) -> Vec<MenuEntry> {
    let mut entries = Vec::new();
    for entry in registry.iter() {
        if entry.kind() != Some(ObPluginKind::Context) {
            continue;
        }
        if entry.supported_object_type() != object_type {
            continue;
        }
        if entries.is_empty() {
            entries.push(MenuEntry::Separator);
        }
        entries.push(MenuEntry::Item {
            menu_id: entry.menu_id(),
            title: entry.description(),
        });
    }
    entries
}
