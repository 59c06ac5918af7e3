//! Carries the plugin file description but exports no recognized entry
//! point; the host must unload it without creating a registry entry.

objscope_plugin_api::embed_plugin_description!();

#[no_mangle]
pub extern "C" fn unrelated_export() -> u32 {
    7
}
