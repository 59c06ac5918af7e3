//! Context-sensitive fixture plugin for object type 42; refuses to start
//! without the selected-object handle.

#![warn(unsafe_op_in_unsafe_fn)]

use core::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use objscope_plugin_api::{
    ObCapabilityTable, ObPluginDescriptor, ObPluginKind, ObPluginState, ObStr, OB_ERR_INVALID_ARG,
    OB_OK,
};

objscope_plugin_api::embed_plugin_description!();

const SUPPORTED_OBJECT_TYPE: u32 = 42;

static DESCRIPTOR: AtomicPtr<ObPluginDescriptor> = AtomicPtr::new(ptr::null_mut());

#[no_mangle]
pub unsafe extern "C-unwind" fn objscope_plugin_init(descriptor: *mut ObPluginDescriptor) -> bool {
    if descriptor.is_null() {
        return false;
    }
    let out = unsafe { &mut *descriptor };
    out.description_utf8 = ObStr::from_static("Section object inspector");
    out.kind = ObPluginKind::Context as u32;
    out.supported_object_type = SUPPORTED_OBJECT_TYPE;
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
    if table.object_handle == 0 {
        return OB_ERR_INVALID_ARG;
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
