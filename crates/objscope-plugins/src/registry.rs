use libloading::Library;
use objscope_plugin_api::{
    ObPluginDescriptor, ObPluginKind, ObPluginStartFn, ObPluginState, OBJSCOPE_PLUGIN_MENU_ID_BASE,
    OB_PLUGIN_FLAG_REQUIRES_DRIVER, OB_PLUGIN_FLAG_REQUIRES_ELEVATION,
    OB_PLUGIN_FLAG_SUPPORTS_RESTRICTED_RUNTIME,
};
use tracing::warn;

use crate::isolated::{isolated_call, Fault};
use crate::util::obstr_to_string_lossy;

/// One successfully initialized plugin.
///
/// Owns the loaded library for the lifetime of the entry; the descriptor box
/// never moves, so the pointer handed to the plugin at init stays valid
/// until teardown.
pub struct PluginEntry {
    menu_id: u32,
    file_name: String,
    descriptor: Box<ObPluginDescriptor>,
    // Kept for ownership: dropping it unloads the module. None only for
    // in-process test entries.
    _library: Option<Library>,
}

impl PluginEntry {
    /// Identifier doubling as the menu-item id for this plugin.
    pub fn menu_id(&self) -> u32 {
        self.menu_id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn description(&self) -> String {
        // SAFETY: the descriptor's description bytes live in the plugin
        // module, which stays loaded as long as this entry owns it.
        unsafe { obstr_to_string_lossy(self.descriptor.description_utf8) }
    }

    pub fn kind(&self) -> Option<ObPluginKind> {
        self.descriptor.kind()
    }

    pub fn supported_object_type(&self) -> u32 {
        self.descriptor.supported_object_type
    }

    pub fn state(&self) -> Option<ObPluginState> {
        self.descriptor.state()
    }

    pub fn state_raw(&self) -> u32 {
        self.descriptor.state_raw()
    }

    pub(crate) fn set_state(&self, state: ObPluginState) {
        self.descriptor.set_state(state as u32);
    }

    pub fn requires_elevation(&self) -> bool {
        self.descriptor.has_flag(OB_PLUGIN_FLAG_REQUIRES_ELEVATION)
    }

    pub fn requires_driver(&self) -> bool {
        self.descriptor.has_flag(OB_PLUGIN_FLAG_REQUIRES_DRIVER)
    }

    pub fn supports_restricted_runtime(&self) -> bool {
        self.descriptor
            .has_flag(OB_PLUGIN_FLAG_SUPPORTS_RESTRICTED_RUNTIME)
    }

    pub(crate) fn start_fn(&self) -> Option<ObPluginStartFn> {
        self.descriptor.start
    }

    /// Invoke the plugin's stop entry point inside the fault boundary and
    /// record the `Stopped` state on success.
    pub(crate) fn force_stop(&self) -> Result<(), Fault> {
        let Some(stop) = self.descriptor.stop else {
            self.set_state(ObPluginState::Stopped);
            return Ok(());
        };
        // SAFETY: entry points resolved from the loaded module; the library
        // is still owned by this entry.
        isolated_call("plugin stop", || unsafe { stop() })?;
        self.set_state(ObPluginState::Stopped);
        Ok(())
    }
}

/// Catalog of loaded plugins, built by one discovery pass and read-only
/// afterwards until teardown.
///
/// Menu identifiers are assigned sequentially from
/// [`OBJSCOPE_PLUGIN_MENU_ID_BASE`], so an id lookup is direct indexing;
/// insertion order is preserved for menu placement.
pub struct PluginRegistry {
    entries: Vec<PluginEntry>,
    capacity: usize,
}

impl PluginRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter()
    }

    pub fn get(&self, menu_id: u32) -> Option<&PluginEntry> {
        let index = menu_id.checked_sub(OBJSCOPE_PLUGIN_MENU_ID_BASE)? as usize;
        self.entries.get(index)
    }

    pub(crate) fn insert_loaded(
        &mut self,
        descriptor: Box<ObPluginDescriptor>,
        library: Library,
        file_name: String,
    ) -> u32 {
        self.insert_inner(descriptor, Some(library), file_name)
    }

    #[cfg(test)]
    pub(crate) fn insert_in_process(
        &mut self,
        descriptor: Box<ObPluginDescriptor>,
        file_name: String,
    ) -> u32 {
        self.insert_inner(descriptor, None, file_name)
    }

    fn insert_inner(
        &mut self,
        descriptor: Box<ObPluginDescriptor>,
        library: Option<Library>,
        file_name: String,
    ) -> u32 {
        debug_assert!(!self.is_full());
        let menu_id = OBJSCOPE_PLUGIN_MENU_ID_BASE + self.entries.len() as u32;
        self.entries.push(PluginEntry {
            menu_id,
            file_name,
            descriptor,
            _library: library,
        });
        menu_id
    }

    /// Teardown: stop every plugin inside the fault boundary, then release
    /// the entries (dropping each entry unloads its module).
    pub fn stop_all(&mut self) {
        for entry in &self.entries {
            if let Err(fault) = entry.force_stop() {
                warn!(
                    file = entry.file_name(),
                    %fault,
                    "plugin stop faulted during teardown"
                );
            }
        }
        self.entries.clear();
    }
}
