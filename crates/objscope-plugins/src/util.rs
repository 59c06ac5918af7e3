use objscope_plugin_api::ObStr;

pub(crate) unsafe fn obstr_to_string_lossy(s: ObStr) -> String {
    if s.ptr.is_null() || s.len == 0 {
        return String::new();
    }
    let bytes = unsafe { core::slice::from_raw_parts(s.ptr, s.len) };
    String::from_utf8_lossy(bytes).into_owned()
}
