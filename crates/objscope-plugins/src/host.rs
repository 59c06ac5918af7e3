//! Seams to the rest of the application.
//!
//! The manager never talks to the window system, the kernel channel, or the
//! namespace enumerator directly; the embedding application hands in these
//! trait objects once at startup and the manager forwards through them,
//! both for its own dialogs and for the service callbacks it exposes to
//! plugins.

use std::sync::Arc;

use objscope_plugin_api::ObOsVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

/// Dialog and shell helpers provided by the UI layer.
pub trait HostUi: Send + Sync {
    fn message_box(&self, severity: MessageSeverity, text: &str);

    /// Yes/no prompt; `true` means the user confirmed.
    fn confirm(&self, text: &str) -> bool;

    fn copy_to_clipboard(&self, _text: &str) {}

    fn dpi_value(&self) -> u32 {
        96
    }

    fn show_file_properties(&self, _path: &str) {}
}

/// Status-code result of a host service; the code travels to plugins as-is.
pub type ServiceResult<T> = std::result::Result<T, i32>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub base_address: u64,
    pub image_size: u64,
    pub name: String,
}

/// System-side services backed by the kernel-communication layer.
pub trait HostServices: Send + Sync {
    /// Copy the requested system information block into `out`, returning the
    /// number of bytes written.
    fn system_info(&self, info_class: u32, out: &mut [u8]) -> ServiceResult<usize>;

    /// Privileged read from system address space through the driver channel.
    fn read_system_memory(&self, address: u64, out: &mut [u8]) -> ServiceResult<usize>;

    fn instruction_length(&self, code: &[u8]) -> ServiceResult<u32>;

    fn module_entry_by_name(&self, name: &str) -> Option<ModuleEntry>;

    fn module_entry_by_address(&self, address: u64) -> Option<ModuleEntry>;

    fn module_name_by_address(&self, address: u64) -> Option<String>;

    /// Translate a native object path into a file-system path.
    fn file_path_for_native(&self, native_path: &str) -> Option<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionSurface {
    ListView,
    TreeView,
}

/// The object a user currently has focused in one of the two selection
/// surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedObject {
    pub name: String,
    pub type_tag: u32,
    pub directory_path: String,
    pub surface: SelectionSurface,
}

/// Read-only view of the focused selection, provided by the UI layer.
pub trait SelectionSource: Send + Sync {
    fn focused_object(&self) -> Option<SelectedObject>;
}

/// Open/close access to namespace objects, backed by the enumeration layer.
pub trait ObjectNamespace: Send + Sync {
    /// Open the object and return its raw OS handle, or a status code.
    fn open_object(&self, object: &SelectedObject) -> ServiceResult<u64>;

    fn close_object(&self, handle: u64);
}

/// Scoped ownership of an opened object handle.
///
/// The handle is closed when the guard drops, on every exit path, regardless
/// of what the plugin did with the raw value it was shown.
pub struct OwnedObjectHandle {
    raw: u64,
    namespace: Arc<dyn ObjectNamespace>,
}

impl OwnedObjectHandle {
    pub fn open(namespace: Arc<dyn ObjectNamespace>, object: &SelectedObject) -> ServiceResult<Self> {
        let raw = namespace.open_object(object)?;
        Ok(Self { raw, namespace })
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }
}

impl Drop for OwnedObjectHandle {
    fn drop(&mut self) {
        self.namespace.close_object(self.raw);
    }
}

impl std::fmt::Debug for OwnedObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedObjectHandle")
            .field("raw", &self.raw)
            .finish()
    }
}

/// Environment facts evaluated at activation time.
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    /// Opaque parent window reference, passed through to plugins.
    pub parent_window: usize,
    /// Opaque host instance handle, passed through to plugins.
    pub host_instance: usize,
    pub system_range_start: u64,
    pub os_version: ObOsVersion,
    /// Running under a restricted compatibility runtime.
    pub restricted_runtime: bool,
    /// Host process is fully elevated.
    pub elevated: bool,
    /// The privileged driver channel opened successfully.
    pub driver_ready: bool,
}

/// Everything the dispatcher needs from the embedding application.
#[derive(Clone)]
pub struct HostContext {
    pub ui: Arc<dyn HostUi>,
    pub services: Arc<dyn HostServices>,
    pub namespace: Arc<dyn ObjectNamespace>,
    pub selection: Arc<dyn SelectionSource>,
    pub environment: HostEnvironment,
}
