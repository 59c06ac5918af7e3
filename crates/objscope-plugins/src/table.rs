//! Per-activation capability table construction.
//!
//! The table is the entire surface a plugin may call. It is built zeroed,
//! populated, and handed to `start` together with a boxed [`HostCallCtx`]
//! whose address travels as `user_data`; both boxes must outlive the call.
//! Every callback null-checks its context and shields the host trait
//! implementations behind a panic guard so nothing unwinds into plugin
//! frames.

use core::ffi::c_void;
use std::sync::Arc;

use objscope_plugin_api::{
    ObCapabilityTable, ObModuleEntry, ObStr, OBJSCOPE_PLUGIN_API_VERSION, OB_ERR_INVALID_ARG,
    OB_ERR_NOT_FOUND, OB_ERR_BUFFER_TOO_SMALL, OB_MODULE_NAME_MAX, OB_OK, OB_UI_MESSAGE_ERROR,
    OB_UI_MESSAGE_WARNING,
};

use crate::host::{HostEnvironment, HostServices, HostUi, MessageSeverity, ModuleEntry, OwnedObjectHandle};
use crate::isolated::{guard_status, guard_with_default};
use crate::util::obstr_to_string_lossy;

pub(crate) struct HostCallCtx {
    services: Arc<dyn HostServices>,
    ui: Arc<dyn HostUi>,
}

pub(crate) fn build_capability_table(
    environment: &HostEnvironment,
    services: Arc<dyn HostServices>,
    ui: Arc<dyn HostUi>,
    object_handle: Option<&OwnedObjectHandle>,
) -> (Box<ObCapabilityTable>, Box<HostCallCtx>) {
    let mut ctx = Box::new(HostCallCtx { services, ui });

    // Zeroed first so unused optional fields are unambiguously absent.
    let mut table = Box::new(ObCapabilityTable::zeroed());
    table.api_version = OBJSCOPE_PLUGIN_API_VERSION;
    table.parent_window = environment.parent_window as *mut c_void;
    table.host_instance = environment.host_instance as *mut c_void;
    table.system_range_start = environment.system_range_start;
    table.object_handle = object_handle.map_or(0, OwnedObjectHandle::raw);
    table.os_version = environment.os_version;
    table.user_data = (&mut *ctx) as *mut HostCallCtx as *mut c_void;

    table.get_system_info = Some(shim_get_system_info);
    table.read_system_memory = Some(shim_read_system_memory);
    table.get_instruction_length = Some(shim_get_instruction_length);
    table.find_module_entry_by_name = Some(shim_find_module_entry_by_name);
    table.find_module_entry_by_address = Some(shim_find_module_entry_by_address);
    table.find_module_name_by_address = Some(shim_find_module_name_by_address);
    table.get_file_path = Some(shim_get_file_path);
    table.ui_show_message = Some(shim_ui_show_message);
    table.ui_copy_to_clipboard = Some(shim_ui_copy_to_clipboard);
    table.ui_get_dpi_value = Some(shim_ui_get_dpi_value);
    table.ui_show_file_properties = Some(shim_ui_show_file_properties);

    (table, ctx)
}

unsafe fn ctx_from<'a>(user_data: *mut c_void) -> Option<&'a HostCallCtx> {
    unsafe { (user_data as *const HostCallCtx).as_ref() }
}

fn severity_from_raw(raw: u32) -> MessageSeverity {
    match raw {
        OB_UI_MESSAGE_ERROR => MessageSeverity::Error,
        OB_UI_MESSAGE_WARNING => MessageSeverity::Warning,
        _ => MessageSeverity::Info,
    }
}

/// Copy `value` into a caller-provided buffer, always reporting the
/// required length through `out_len`.
fn copy_utf8_out(value: &str, out: *mut u8, out_cap: usize, out_len: *mut usize) -> i32 {
    let bytes = value.as_bytes();
    if !out_len.is_null() {
        // SAFETY: caller-provided out-parameter, null-checked above.
        unsafe { *out_len = bytes.len() };
    }
    if bytes.len() > out_cap {
        return OB_ERR_BUFFER_TOO_SMALL;
    }
    if out.is_null() {
        return OB_ERR_INVALID_ARG;
    }
    // SAFETY: `out` holds at least `out_cap >= bytes.len()` writable bytes.
    unsafe { core::ptr::copy_nonoverlapping(bytes.as_ptr(), out, bytes.len()) };
    OB_OK
}

fn fill_module_entry(entry: &ModuleEntry, out_entry: *mut ObModuleEntry) -> i32 {
    if out_entry.is_null() {
        return OB_ERR_INVALID_ARG;
    }
    let mut value = ObModuleEntry::zeroed();
    value.base_address = entry.base_address;
    value.image_size = entry.image_size;
    let name = entry.name.as_bytes();
    let copied = name.len().min(OB_MODULE_NAME_MAX);
    value.name_utf8[..copied].copy_from_slice(&name[..copied]);
    value.name_len = copied as u32;
    // SAFETY: caller-provided out-parameter, null-checked above.
    unsafe { *out_entry = value };
    OB_OK
}

/// Build the mutable byte slice behind an (`ptr`, `cap`) pair, treating a
/// zero capacity as an empty probe buffer.
unsafe fn out_slice<'a>(out: *mut u8, out_cap: usize) -> Option<&'a mut [u8]> {
    if out_cap == 0 {
        return Some(&mut []);
    }
    if out.is_null() {
        return None;
    }
    Some(unsafe { core::slice::from_raw_parts_mut(out, out_cap) })
}

extern "C" fn shim_get_system_info(
    user_data: *mut c_void,
    info_class: u32,
    out: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32 {
    guard_status("get_system_info", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        let Some(buffer) = (unsafe { out_slice(out, out_cap) }) else {
            return OB_ERR_INVALID_ARG;
        };
        match ctx.services.system_info(info_class, buffer) {
            Ok(written) => {
                if !out_len.is_null() {
                    // SAFETY: caller-provided out-parameter, null-checked.
                    unsafe { *out_len = written };
                }
                OB_OK
            }
            Err(code) => code,
        }
    })
}

extern "C" fn shim_read_system_memory(
    user_data: *mut c_void,
    address: u64,
    out: *mut u8,
    len: usize,
    out_read: *mut usize,
) -> i32 {
    guard_status("read_system_memory", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        let Some(buffer) = (unsafe { out_slice(out, len) }) else {
            return OB_ERR_INVALID_ARG;
        };
        match ctx.services.read_system_memory(address, buffer) {
            Ok(read) => {
                if !out_read.is_null() {
                    // SAFETY: caller-provided out-parameter, null-checked.
                    unsafe { *out_read = read };
                }
                OB_OK
            }
            Err(code) => code,
        }
    })
}

extern "C" fn shim_get_instruction_length(
    user_data: *mut c_void,
    code: *const u8,
    code_len: usize,
    out_len: *mut u32,
) -> i32 {
    guard_status("get_instruction_length", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        if code.is_null() || out_len.is_null() {
            return OB_ERR_INVALID_ARG;
        }
        // SAFETY: plugin-provided code bytes, null-checked above.
        let bytes = unsafe { core::slice::from_raw_parts(code, code_len) };
        match ctx.services.instruction_length(bytes) {
            Ok(length) => {
                // SAFETY: caller-provided out-parameter, null-checked.
                unsafe { *out_len = length };
                OB_OK
            }
            Err(status) => status,
        }
    })
}

extern "C" fn shim_find_module_entry_by_name(
    user_data: *mut c_void,
    name_utf8: ObStr,
    out_entry: *mut ObModuleEntry,
) -> i32 {
    guard_status("find_module_entry_by_name", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        // SAFETY: plugin-provided view, valid for the duration of the call.
        let name = unsafe { obstr_to_string_lossy(name_utf8) };
        match ctx.services.module_entry_by_name(&name) {
            Some(entry) => fill_module_entry(&entry, out_entry),
            None => OB_ERR_NOT_FOUND,
        }
    })
}

extern "C" fn shim_find_module_entry_by_address(
    user_data: *mut c_void,
    address: u64,
    out_entry: *mut ObModuleEntry,
) -> i32 {
    guard_status("find_module_entry_by_address", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        match ctx.services.module_entry_by_address(address) {
            Some(entry) => fill_module_entry(&entry, out_entry),
            None => OB_ERR_NOT_FOUND,
        }
    })
}

extern "C" fn shim_find_module_name_by_address(
    user_data: *mut c_void,
    address: u64,
    out_utf8: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32 {
    guard_status("find_module_name_by_address", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        match ctx.services.module_name_by_address(address) {
            Some(name) => copy_utf8_out(&name, out_utf8, out_cap, out_len),
            None => OB_ERR_NOT_FOUND,
        }
    })
}

extern "C" fn shim_get_file_path(
    user_data: *mut c_void,
    native_path_utf8: ObStr,
    out_utf8: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32 {
    guard_status("get_file_path", || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return OB_ERR_INVALID_ARG;
        };
        // SAFETY: plugin-provided view, valid for the duration of the call.
        let native = unsafe { obstr_to_string_lossy(native_path_utf8) };
        match ctx.services.file_path_for_native(&native) {
            Some(path) => copy_utf8_out(&path, out_utf8, out_cap, out_len),
            None => OB_ERR_NOT_FOUND,
        }
    })
}

extern "C" fn shim_ui_show_message(user_data: *mut c_void, severity: u32, text_utf8: ObStr) {
    guard_with_default("ui_show_message", (), || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return;
        };
        // SAFETY: plugin-provided view, valid for the duration of the call.
        let text = unsafe { obstr_to_string_lossy(text_utf8) };
        ctx.ui.message_box(severity_from_raw(severity), &text);
    });
}

extern "C" fn shim_ui_copy_to_clipboard(user_data: *mut c_void, text_utf8: ObStr) {
    guard_with_default("ui_copy_to_clipboard", (), || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return;
        };
        // SAFETY: plugin-provided view, valid for the duration of the call.
        let text = unsafe { obstr_to_string_lossy(text_utf8) };
        ctx.ui.copy_to_clipboard(&text);
    });
}

extern "C" fn shim_ui_get_dpi_value(user_data: *mut c_void) -> u32 {
    guard_with_default("ui_get_dpi_value", 96, || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return 96;
        };
        ctx.ui.dpi_value()
    })
}

extern "C" fn shim_ui_show_file_properties(user_data: *mut c_void, path_utf8: ObStr) {
    guard_with_default("ui_show_file_properties", (), || {
        let Some(ctx) = (unsafe { ctx_from(user_data) }) else {
            return;
        };
        // SAFETY: plugin-provided view, valid for the duration of the call.
        let path = unsafe { obstr_to_string_lossy(path_utf8) };
        ctx.ui.show_file_properties(&path);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ServiceResult;

    struct FixedServices;

    impl HostServices for FixedServices {
        fn system_info(&self, info_class: u32, out: &mut [u8]) -> ServiceResult<usize> {
            if info_class == 0xdead {
                panic!("intentional service failure");
            }
            let payload = info_class.to_le_bytes();
            let copied = payload.len().min(out.len());
            out[..copied].copy_from_slice(&payload[..copied]);
            Ok(copied)
        }

        fn read_system_memory(&self, address: u64, out: &mut [u8]) -> ServiceResult<usize> {
            for (i, byte) in out.iter_mut().enumerate() {
                *byte = (address as u8).wrapping_add(i as u8);
            }
            Ok(out.len())
        }

        fn instruction_length(&self, code: &[u8]) -> ServiceResult<u32> {
            if code.is_empty() {
                return Err(OB_ERR_INVALID_ARG);
            }
            Ok(1)
        }

        fn module_entry_by_name(&self, name: &str) -> Option<ModuleEntry> {
            (name == "ntoskrnl.exe").then(|| ModuleEntry {
                base_address: 0xffff_8000_0000_0000,
                image_size: 0x80_0000,
                name: name.to_string(),
            })
        }

        fn module_entry_by_address(&self, _address: u64) -> Option<ModuleEntry> {
            None
        }

        fn module_name_by_address(&self, address: u64) -> Option<String> {
            (address != 0).then(|| "hal.dll".to_string())
        }

        fn file_path_for_native(&self, _native_path: &str) -> Option<String> {
            None
        }
    }

    struct SilentUi;

    impl HostUi for SilentUi {
        fn message_box(&self, _severity: MessageSeverity, _text: &str) {}

        fn confirm(&self, _text: &str) -> bool {
            false
        }

        fn dpi_value(&self) -> u32 {
            144
        }
    }

    fn built_table() -> (Box<ObCapabilityTable>, Box<HostCallCtx>) {
        build_capability_table(
            &HostEnvironment {
                system_range_start: 0xffff_8000_0000_0000,
                ..HostEnvironment::default()
            },
            Arc::new(FixedServices),
            Arc::new(SilentUi),
            None,
        )
    }

    #[test]
    fn table_is_fully_populated_and_versioned() {
        let (table, _ctx) = built_table();
        assert_eq!(table.api_version, OBJSCOPE_PLUGIN_API_VERSION);
        assert_eq!(table.object_handle, 0);
        assert!(table.get_system_info.is_some());
        assert!(table.read_system_memory.is_some());
        assert!(table.get_instruction_length.is_some());
        assert!(table.find_module_entry_by_name.is_some());
        assert!(table.find_module_entry_by_address.is_some());
        assert!(table.find_module_name_by_address.is_some());
        assert!(table.get_file_path.is_some());
        assert!(table.ui_show_message.is_some());
        assert!(table.ui_copy_to_clipboard.is_some());
        assert!(table.ui_get_dpi_value.is_some());
        assert!(table.ui_show_file_properties.is_some());
        assert!(!table.user_data.is_null());
    }

    #[test]
    fn callbacks_round_trip_through_the_host_traits() {
        let (table, _ctx) = built_table();

        let mut out = [0u8; 8];
        let mut read = 0usize;
        let status = table.read_system_memory.expect("callback populated")(
            table.user_data,
            0x10,
            out.as_mut_ptr(),
            out.len(),
            &mut read,
        );
        assert_eq!(status, OB_OK);
        assert_eq!(read, 8);
        assert_eq!(out[0], 0x10);

        assert_eq!(
            table.ui_get_dpi_value.expect("callback populated")(table.user_data),
            144
        );
    }

    #[test]
    fn module_lookup_reports_not_found_and_fills_entries() {
        let (table, _ctx) = built_table();
        let lookup = table.find_module_entry_by_name.expect("callback populated");

        let mut entry = ObModuleEntry::zeroed();
        let status = lookup(table.user_data, ObStr::from_static("ntoskrnl.exe"), &mut entry);
        assert_eq!(status, OB_OK);
        assert_eq!(entry.base_address, 0xffff_8000_0000_0000);
        assert_eq!(&entry.name_utf8[..entry.name_len as usize], b"ntoskrnl.exe");

        let status = lookup(table.user_data, ObStr::from_static("missing.sys"), &mut entry);
        assert_eq!(status, OB_ERR_NOT_FOUND);
    }

    #[test]
    fn string_results_report_required_length() {
        let (table, _ctx) = built_table();
        let name_by_address = table
            .find_module_name_by_address
            .expect("callback populated");

        let mut needed = 0usize;
        let status = name_by_address(table.user_data, 0x1000, core::ptr::null_mut(), 0, &mut needed);
        assert_eq!(status, OB_ERR_BUFFER_TOO_SMALL);
        assert_eq!(needed, "hal.dll".len());

        let mut buffer = [0u8; 32];
        let mut written = 0usize;
        let status = name_by_address(
            table.user_data,
            0x1000,
            buffer.as_mut_ptr(),
            buffer.len(),
            &mut written,
        );
        assert_eq!(status, OB_OK);
        assert_eq!(&buffer[..written], b"hal.dll");
    }

    #[test]
    fn panicking_service_is_contained() {
        let (table, _ctx) = built_table();
        let mut out = [0u8; 4];
        let mut len = 0usize;
        let status = table.get_system_info.expect("callback populated")(
            table.user_data,
            0xdead,
            out.as_mut_ptr(),
            out.len(),
            &mut len,
        );
        assert_eq!(status, objscope_plugin_api::OB_ERR_INTERNAL);
    }

    #[test]
    fn null_context_is_rejected() {
        let (table, _ctx) = built_table();
        let mut out = [0u8; 4];
        let status = table.read_system_memory.expect("callback populated")(
            core::ptr::null_mut(),
            0,
            out.as_mut_ptr(),
            out.len(),
            core::ptr::null_mut(),
        );
        assert_eq!(status, OB_ERR_INVALID_ARG);
    }
}
