//! General-purpose fixture plugin: probes a couple of host services through
//! the capability table and reports its state transitions.

#![warn(unsafe_op_in_unsafe_fn)]

use core::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use objscope_plugin_api::{
    ObCapabilityTable, ObPluginDescriptor, ObPluginKind, ObPluginState, ObStr, OB_ERR_INTERNAL,
    OB_ERR_INVALID_ARG, OB_OK, OB_PLUGIN_FLAG_SUPPORTS_RESTRICTED_RUNTIME,
};

objscope_plugin_api::embed_plugin_description!();

static DESCRIPTOR: AtomicPtr<ObPluginDescriptor> = AtomicPtr::new(ptr::null_mut());

#[no_mangle]
pub unsafe extern "C-unwind" fn objscope_plugin_init(descriptor: *mut ObPluginDescriptor) -> bool {
    if descriptor.is_null() {
        return false;
    }
    let out = unsafe { &mut *descriptor };
    out.description_utf8 = ObStr::from_static("Sample diagnostics plugin");
    out.kind = ObPluginKind::General as u32;
    out.flags = OB_PLUGIN_FLAG_SUPPORTS_RESTRICTED_RUNTIME;
    out.start = Some(plugin_start);
    out.stop = Some(plugin_stop);
    DESCRIPTOR.store(descriptor, Ordering::Release);
    true
}

extern "C-unwind" fn plugin_start(table: *const ObCapabilityTable) -> i32 {
    if table.is_null() {
        return OB_ERR_INVALID_ARG;
    }
    let table = unsafe { &*table };

    let Some(dpi) = table.ui_get_dpi_value else {
        return OB_ERR_INVALID_ARG;
    };
    if dpi(table.user_data) == 0 {
        return OB_ERR_INTERNAL;
    }

    let Some(read_memory) = table.read_system_memory else {
        return OB_ERR_INVALID_ARG;
    };
    let mut buffer = [0u8; 4];
    let mut read = 0usize;
    let status = read_memory(
        table.user_data,
        table.system_range_start,
        buffer.as_mut_ptr(),
        buffer.len(),
        &mut read,
    );
    if status != OB_OK || read != buffer.len() {
        return OB_ERR_INTERNAL;
    }

    report_state(ObPluginState::Running as u32);
    OB_OK
}

extern "C-unwind" fn plugin_stop() {
    report_state(ObPluginState::Stopped as u32);
}

fn report_state(state: u32) {
    let descriptor = DESCRIPTOR.load(Ordering::Acquire);
    if descriptor.is_null() {
        return;
    }
    if let Some(notify) = unsafe { (*descriptor).notify_state_change } {
        unsafe { notify(descriptor, state, ptr::null_mut()) };
    }
}
