use core::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::table::ObCapabilityTable;
use crate::ObStr;

/// Kinds a plugin may declare at initialization.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObPluginKind {
    /// Always activatable from the static plugins menu.
    General = 1,
    /// Activatable only against a selected object of the declared type.
    Context = 2,
}

impl ObPluginKind {
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::General),
            2 => Some(Self::Context),
            _ => None,
        }
    }
}

// Capability flag bits a plugin may set in `ObPluginDescriptor::flags`.
/// Start is refused unless the host process runs fully elevated.
pub const OB_PLUGIN_FLAG_REQUIRES_ELEVATION: u32 = 1 << 0;
/// Start is refused unless the privileged driver channel is open.
pub const OB_PLUGIN_FLAG_REQUIRES_DRIVER: u32 = 1 << 1;
/// The plugin keeps working under a restricted (compatibility) runtime.
pub const OB_PLUGIN_FLAG_SUPPORTS_RESTRICTED_RUNTIME: u32 = 1 << 2;

/// Well-known lifecycle states. Plugins may report further substates through
/// the notification callback; the host records unknown values verbatim.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObPluginState {
    Loaded = 1,
    Running = 2,
    Stopped = 3,
}

impl ObPluginState {
    pub const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Loaded),
            2 => Some(Self::Running),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// Module entry point resolved by name at load time. Populates the
/// host-allocated descriptor; returning `false` rejects the module.
pub type ObPluginInitFn = unsafe extern "C-unwind" fn(descriptor: *mut ObPluginDescriptor) -> bool;

/// Synchronous activation entry point. The capability table is valid only
/// for the duration of the call. Returns [`crate::OB_OK`] on success.
pub type ObPluginStartFn = unsafe extern "C-unwind" fn(table: *const ObCapabilityTable) -> i32;

pub type ObPluginStopFn = unsafe extern "C-unwind" fn();

/// Host-installed state notification sink. May be invoked from any thread
/// the plugin owns. `reserved` is a forward-compatibility slot and must be
/// passed through unchanged (currently null).
pub type ObStateChangeFn =
    unsafe extern "C-unwind" fn(descriptor: *mut ObPluginDescriptor, new_state: u32, reserved: *mut c_void);

/// Metadata and entry points a plugin fills in during init.
///
/// The host allocates the block zeroed, hands it to the init export once,
/// and afterwards only reads it, except for `state`, which both sides write
/// through plain atomic stores.
#[repr(C)]
#[derive(Debug)]
pub struct ObPluginDescriptor {
    /// Plugin-owned static bytes shown in menus and dialogs.
    pub description_utf8: ObStr,
    /// One of [`ObPluginKind`] as a raw value.
    pub kind: u32,
    /// Object-type tag a context plugin activates against. Ignored for
    /// general-purpose plugins.
    pub supported_object_type: u32,
    /// `OB_PLUGIN_FLAG_*` bits.
    pub flags: u32,
    /// Current lifecycle state, one of [`ObPluginState`] or a plugin-defined
    /// substate. Written through `notify_state_change` from arbitrary
    /// plugin threads.
    pub state: AtomicU32,
    pub start: Option<ObPluginStartFn>,
    pub stop: Option<ObPluginStopFn>,
    /// Installed by the host after a successful init; null while init runs.
    pub notify_state_change: Option<ObStateChangeFn>,
    /// Additive-tail slack; must stay zero.
    pub reserved: [u64; 4],
}

impl ObPluginDescriptor {
    pub const fn zeroed() -> Self {
        Self {
            description_utf8: ObStr::empty(),
            kind: 0,
            supported_object_type: 0,
            flags: 0,
            state: AtomicU32::new(0),
            start: None,
            stop: None,
            notify_state_change: None,
            reserved: [0; 4],
        }
    }

    pub fn kind(&self) -> Option<ObPluginKind> {
        ObPluginKind::from_raw(self.kind)
    }

    /// Raw state value as last reported.
    pub fn state_raw(&self) -> u32 {
        self.state.load(Ordering::Acquire)
    }

    pub fn state(&self) -> Option<ObPluginState> {
        ObPluginState::from_raw(self.state_raw())
    }

    pub fn set_state(&self, raw: u32) {
        self.state.store(raw, Ordering::Release);
    }

    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag != 0
    }
}
