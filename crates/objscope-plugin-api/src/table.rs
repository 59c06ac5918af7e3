use core::ffi::c_void;

use crate::ObStr;

/// OS version block copied into every capability table.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObOsVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub reserved: u32,
}

pub const OB_MODULE_NAME_MAX: usize = 256;

/// Loaded-module record returned by the module lookup services.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObModuleEntry {
    pub base_address: u64,
    pub image_size: u64,
    /// UTF-8, not NUL-terminated; `name_len` bytes are valid.
    pub name_utf8: [u8; OB_MODULE_NAME_MAX],
    pub name_len: u32,
    pub reserved: u32,
}

impl ObModuleEntry {
    pub const fn zeroed() -> Self {
        Self {
            base_address: 0,
            image_size: 0,
            name_utf8: [0; OB_MODULE_NAME_MAX],
            name_len: 0,
            reserved: 0,
        }
    }
}

// Message severities for `ui_show_message`.
pub const OB_UI_MESSAGE_INFO: u32 = 1;
pub const OB_UI_MESSAGE_WARNING: u32 = 2;
pub const OB_UI_MESSAGE_ERROR: u32 = 3;

// Host service callbacks. Every callback takes the table's `user_data` as
// its first argument and returns an `OB_*` status code unless noted. String
// results are copied into a caller-provided buffer; when the buffer is too
// small the callback returns [`crate::OB_ERR_BUFFER_TOO_SMALL`] and stores
// the required length in `out_len`.
pub type ObGetSystemInfoFn = extern "C" fn(
    user_data: *mut c_void,
    info_class: u32,
    out: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32;

pub type ObReadSystemMemoryFn = extern "C" fn(
    user_data: *mut c_void,
    address: u64,
    out: *mut u8,
    len: usize,
    out_read: *mut usize,
) -> i32;

pub type ObGetInstructionLengthFn =
    extern "C" fn(user_data: *mut c_void, code: *const u8, code_len: usize, out_len: *mut u32) -> i32;

pub type ObFindModuleEntryByNameFn =
    extern "C" fn(user_data: *mut c_void, name_utf8: ObStr, out_entry: *mut ObModuleEntry) -> i32;

pub type ObFindModuleEntryByAddressFn =
    extern "C" fn(user_data: *mut c_void, address: u64, out_entry: *mut ObModuleEntry) -> i32;

pub type ObFindModuleNameByAddressFn = extern "C" fn(
    user_data: *mut c_void,
    address: u64,
    out_utf8: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32;

pub type ObGetFilePathFn = extern "C" fn(
    user_data: *mut c_void,
    native_path_utf8: ObStr,
    out_utf8: *mut u8,
    out_cap: usize,
    out_len: *mut usize,
) -> i32;

pub type ObUiShowMessageFn = extern "C" fn(user_data: *mut c_void, severity: u32, text_utf8: ObStr);

pub type ObUiCopyToClipboardFn = extern "C" fn(user_data: *mut c_void, text_utf8: ObStr);

pub type ObUiGetDpiValueFn = extern "C" fn(user_data: *mut c_void) -> u32;

pub type ObUiShowFilePropertiesFn = extern "C" fn(user_data: *mut c_void, path_utf8: ObStr);

/// The per-activation bundle of context and host services handed to a
/// plugin's start entry point, and the whole surface a plugin may call.
///
/// Built zeroed and populated by the host immediately before `start`;
/// immutable for the duration of that call. The plugin must not retain the
/// table pointer, any callback, or `user_data` beyond the call.
///
/// `object_handle` stays host-owned: it is valid only while `start` runs and
/// is closed by the host when the call returns. Work a plugin schedules past
/// that point must duplicate the handle itself.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ObCapabilityTable {
    pub api_version: u32,
    pub reserved0: u32,
    pub parent_window: *mut c_void,
    pub host_instance: *mut c_void,
    /// Numeric lower bound of the valid system address range.
    pub system_range_start: u64,
    /// Opened handle to the selected object, 0 when absent (general-purpose
    /// activations).
    pub object_handle: u64,
    pub os_version: ObOsVersion,
    /// Opaque host context passed back as the first argument of every
    /// callback below.
    pub user_data: *mut c_void,
    pub get_system_info: Option<ObGetSystemInfoFn>,
    pub read_system_memory: Option<ObReadSystemMemoryFn>,
    pub get_instruction_length: Option<ObGetInstructionLengthFn>,
    pub find_module_entry_by_name: Option<ObFindModuleEntryByNameFn>,
    pub find_module_entry_by_address: Option<ObFindModuleEntryByAddressFn>,
    pub find_module_name_by_address: Option<ObFindModuleNameByAddressFn>,
    pub get_file_path: Option<ObGetFilePathFn>,
    pub ui_show_message: Option<ObUiShowMessageFn>,
    pub ui_copy_to_clipboard: Option<ObUiCopyToClipboardFn>,
    pub ui_get_dpi_value: Option<ObUiGetDpiValueFn>,
    pub ui_show_file_properties: Option<ObUiShowFilePropertiesFn>,
    /// Additive-tail slack for future host services; zero until assigned.
    pub reserved: [u64; 8],
}

impl ObCapabilityTable {
    pub const fn zeroed() -> Self {
        Self {
            api_version: 0,
            reserved0: 0,
            parent_window: core::ptr::null_mut(),
            host_instance: core::ptr::null_mut(),
            system_range_start: 0,
            object_handle: 0,
            os_version: ObOsVersion {
                major: 0,
                minor: 0,
                build: 0,
                reserved: 0,
            },
            user_data: core::ptr::null_mut(),
            get_system_info: None,
            read_system_memory: None,
            get_instruction_length: None,
            find_module_entry_by_name: None,
            find_module_entry_by_address: None,
            find_module_name_by_address: None,
            get_file_path: None,
            ui_show_message: None,
            ui_copy_to_clipboard: None,
            ui_get_dpi_value: None,
            ui_show_file_properties: None,
            reserved: [0; 8],
        }
    }
}
