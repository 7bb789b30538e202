//! hostfxr exports used by the bootstrap, typed with `netcorehost`'s bindings.

use crate::platform::{PlatformError, SharedLibrary};
use netcorehost::pdcstring::PdChar;
use std::ffi::c_void;
use std::mem;

pub use netcorehost::bindings::hostfxr::{
    hostfxr_delegate_type, hostfxr_handle, hostfxr_initialize_parameters,
    load_assembly_and_get_function_pointer_fn,
};

pub const INITIALIZE_FOR_RUNTIME_CONFIG: &str = "hostfxr_initialize_for_runtime_config";
pub const GET_RUNTIME_DELEGATE: &str = "hostfxr_get_runtime_delegate";
pub const CLOSE: &str = "hostfxr_close";

pub type InitializeForRuntimeConfigFn = unsafe extern "C" fn(
    runtime_config_path: *const PdChar,
    parameters: *const hostfxr_initialize_parameters,
    host_context_handle: *mut hostfxr_handle,
) -> i32;

pub type GetRuntimeDelegateFn = unsafe extern "C" fn(
    host_context_handle: hostfxr_handle,
    delegate_type: hostfxr_delegate_type,
    delegate: *mut *mut c_void,
) -> i32;

pub type CloseFn = unsafe extern "C" fn(host_context_handle: hostfxr_handle) -> i32;

/// Matches C# delegate: `bool BootstrapEntryPointDelegate(IntPtr pluginFuncs, IntPtr pluginEvents, IntPtr pluginInfo)`.
/// The managed bool is read as a byte.
pub type EntryPointFn = unsafe extern "system" fn(
    plugin_funcs: *mut c_void,
    plugin_events: *mut c_void,
    plugin_info: *mut c_void,
) -> u8;

/// The hostfxr exports the bootstrap needs.
#[derive(Clone, Copy)]
pub struct HostfxrExports {
    pub initialize_for_runtime_config: InitializeForRuntimeConfigFn,
    pub get_runtime_delegate: GetRuntimeDelegateFn,
    pub close: CloseFn,
}

impl HostfxrExports {
    /// The returned pointers are only valid while `library` stays loaded.
    pub fn resolve(library: &SharedLibrary) -> Result<Self, PlatformError> {
        let initialize = library.resolve(INITIALIZE_FOR_RUNTIME_CONFIG)?;
        let close = library.resolve(CLOSE)?;
        let get_runtime_delegate = library.resolve(GET_RUNTIME_DELEGATE)?;

        unsafe {
            Ok(Self {
                initialize_for_runtime_config: mem::transmute::<
                    *mut c_void,
                    InitializeForRuntimeConfigFn,
                >(initialize.as_ptr()),
                get_runtime_delegate: mem::transmute::<*mut c_void, GetRuntimeDelegateFn>(
                    get_runtime_delegate.as_ptr(),
                ),
                close: mem::transmute::<*mut c_void, CloseFn>(close.as_ptr()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_assembly_delegate_type_matches_native_enum() {
        assert_eq!(
            hostfxr_delegate_type::hdt_load_assembly_and_get_function_pointer as i32,
            5
        );
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn non_hostfxr_library_is_rejected() {
        let libc = SharedLibrary::load(std::path::Path::new("libc.so.6")).unwrap();
        match HostfxrExports::resolve(&libc) {
            Err(PlatformError::Symbol { name, .. }) => {
                assert_eq!(name, INITIALIZE_FOR_RUNTIME_CONFIG)
            }
            Err(other) => panic!("expected missing symbol, got {:?}", other),
            Ok(_) => panic!("libc should not export hostfxr"),
        }
    }
}
