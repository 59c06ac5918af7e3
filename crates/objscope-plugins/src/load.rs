use core::ffi::c_void;
use std::path::Path;

use libloading::{Library, Symbol};
use objscope_plugin_api::{
    ObPluginDescriptor, ObPluginInitFn, ObPluginState, OBJSCOPE_PLUGIN_ENTRY_SYMBOL,
};
use tracing::debug;

use crate::error::{Error, Result};
use crate::isolated::{isolated_call, Fault};

pub(crate) enum LoadOutcome {
    /// Module initialized; descriptor carries the host notification sink and
    /// the `Loaded` state.
    Loaded {
        descriptor: Box<ObPluginDescriptor>,
        library: Library,
    },
    /// Passed the description probe but exports no entry point. The module
    /// is unloaded again; not an error.
    MissingEntry,
    /// Init returned failure.
    InitRejected,
    /// Init unwound; contained by the fault boundary.
    InitFaulted(Fault),
}

pub(crate) fn load_candidate(path: &Path) -> Result<LoadOutcome> {
    // SAFETY: loading a foreign module runs its initializers; the candidate
    // already passed the description probe, which is the trust gate.
    let library = unsafe { Library::new(path) }.map_err(|e| Error::library(path, e))?;

    // SAFETY: symbol type matches the export contract.
    let init: Symbol<'_, ObPluginInitFn> =
        match unsafe { library.get(OBJSCOPE_PLUGIN_ENTRY_SYMBOL.as_bytes()) } {
            Ok(symbol) => symbol,
            Err(err) => {
                debug!(path = %path.display(), %err, "candidate exports no plugin entry point");
                return Ok(LoadOutcome::MissingEntry);
            }
        };
    let init_fn: ObPluginInitFn = *init;
    drop(init);

    let mut descriptor = Box::new(ObPluginDescriptor::zeroed());
    let descriptor_ptr: *mut ObPluginDescriptor = &mut *descriptor;

    // SAFETY: the descriptor box outlives the call and the entry point was
    // resolved from this module; the fault boundary contains unwinds.
    match isolated_call("plugin init", || unsafe { init_fn(descriptor_ptr) }) {
        Err(fault) => Ok(LoadOutcome::InitFaulted(fault)),
        Ok(false) => Ok(LoadOutcome::InitRejected),
        Ok(true) => {
            // Install the notification sink through the pointer the plugin
            // may have retained, then record the initial state.
            // SAFETY: same allocation as above; the plugin populated it and
            // returned, so no call into it is in flight.
            unsafe {
                (*descriptor_ptr).notify_state_change = Some(notify_state_change);
            }
            descriptor.set_state(ObPluginState::Loaded as u32);
            Ok(LoadOutcome::Loaded {
                descriptor,
                library,
            })
        }
    }
}

/// Notification sink installed into every descriptor after init.
///
/// Plugins may invoke this from any thread they own; recording the reported
/// state is a single atomic store, nothing else is touched.
pub(crate) extern "C-unwind" fn notify_state_change(
    descriptor: *mut ObPluginDescriptor,
    new_state: u32,
    _reserved: *mut c_void,
) {
    if descriptor.is_null() {
        return;
    }
    // SAFETY: descriptor boxes never move and outlive their registry entry.
    let descriptor = unsafe { &*descriptor };
    descriptor.set_state(new_state);
}
