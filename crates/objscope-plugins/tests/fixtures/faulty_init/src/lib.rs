//! Valid-looking plugin whose init unwinds; the host must contain the
//! fault, report it, and keep discovering.

use objscope_plugin_api::ObPluginDescriptor;

objscope_plugin_api::embed_plugin_description!();

#[no_mangle]
pub unsafe extern "C-unwind" fn objscope_plugin_init(_descriptor: *mut ObPluginDescriptor) -> bool {
    panic!("fixture init failure");
}
