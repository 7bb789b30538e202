// VC:MP server plugin that boots .NET and hands the server over to the managed plugin.

use clrhost::{diagnostics, initialize_plugin, PluginContext, SystemHostfxr, SERVER_CONFIG_FILE};
use log::error;
use std::ffi::c_void;
use std::panic;
use std::path::Path;

/// Called once by the server while it loads plugins. Returns 1 when the managed
/// plugin accepted the handover and 0 on any failure; the reason is written to
/// the console.
///
/// The .NET runtime cannot be initialized twice in one process, so calling this
/// again is unsupported.
#[no_mangle]
#[allow(non_snake_case)]
pub extern "C" fn VcmpPluginInit(
    plugin_funcs: *mut c_void,
    plugin_events: *mut c_void,
    plugin_info: *mut c_void,
) -> u32 {
    diagnostics::init();

    let context = PluginContext {
        plugin_funcs,
        plugin_events,
        plugin_info,
    };

    match panic::catch_unwind(move || {
        initialize_plugin(Path::new(SERVER_CONFIG_FILE), &SystemHostfxr, context)
    }) {
        Ok(true) => 1,
        Ok(false) => 0,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("unknown panic");
            error!("Bootstrap panicked: {}", message);
            0
        }
    }
}
