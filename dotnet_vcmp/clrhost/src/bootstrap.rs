use crate::config::{ConfigError, PluginConfig};
use crate::hostfxr::{
    hostfxr_delegate_type, hostfxr_handle, load_assembly_and_get_function_pointer_fn,
    EntryPointFn, HostfxrExports,
};
use crate::BootstrapError;
use log::{debug, error, info, warn};
use netcorehost::pdcstring::PdCString;
use std::ffi::c_void;
use std::mem;
use std::path::{Path, PathBuf};
use std::ptr;

pub const ENTRY_TYPE_NAME: &str =
    "EliteKillerz.DotnetVcmp.RuntimeClient.Bootstrap, EliteKillerz.DotnetVcmp.RuntimeClient";
pub const ENTRY_METHOD_NAME: &str = "VcmpInitialize";
pub const ENTRY_DELEGATE_TYPE_NAME: &str = "EliteKillerz.DotnetVcmp.RuntimeClient.BootstrapEntryPointDelegate, EliteKillerz.DotnetVcmp.RuntimeClient";

/// The three pointers the VC:MP server passes to `VcmpPluginInit`. They are
/// forwarded to managed code as-is and never read here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginContext {
    pub plugin_funcs: *mut c_void,
    pub plugin_events: *mut c_void,
    pub plugin_info: *mut c_void,
}

/// Locates and loads hostfxr.
pub trait HostfxrProvider {
    fn hostfxr_path(&self) -> Result<PathBuf, BootstrapError>;

    /// The exports must stay callable for the rest of the process.
    fn load_hostfxr(&self, path: &Path) -> Result<HostfxrExports, BootstrapError>;
}

/// Runs the hostfxr handshake and hands control to the managed entry point.
///
/// The .NET runtime can be initialized only once per process and is never torn
/// down, so a bootstrapper is meant to run once. A second run is not guarded
/// against; hostfxr answers it with a non-zero status, which fails the run.
pub struct Bootstrapper<'a, P: ?Sized> {
    provider: &'a P,
}

impl<'a, P: HostfxrProvider + ?Sized> Bootstrapper<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self { provider }
    }

    /// Returns what the managed entry point returned. Every step runs at most once.
    pub fn run(&self, config: &PluginConfig, context: PluginContext) -> Result<bool, BootstrapError> {
        let runtime_config = to_pdcstring(&config.runtime_config_path)?;
        let request = EntryPointRequest::new(&config.assembly_path)?;

        let hostfxr_path = self.provider.hostfxr_path()?;
        info!("Using hostfxr library {}.", hostfxr_path.display());

        let exports = self.provider.load_hostfxr(&hostfxr_path)?;

        let runtime = RuntimeContext::initialize(&exports, &runtime_config)?;
        info!("Initialized hostfxr runtime.");

        let loader = runtime.load_assembly_and_get_function_pointer();
        if loader.is_ok() {
            info!("Retrieved load_assembly_and_get_function_pointer delegate.");
        }

        // The handle is released as soon as the loader lookup has run, whatever
        // its outcome. The close status checked is hostfxr_close's own.
        let loader = match (loader, runtime.close()) {
            (Ok(loader), Ok(())) => loader,
            (Ok(_), Err(close_error)) => return Err(close_error),
            (Err(loader_error), closed) => {
                if let Err(close_error) = closed {
                    error!("{}", close_error);
                }
                return Err(loader_error);
            }
        };
        info!("Closed hostfxr handle.");

        let entry_point = request.resolve(loader)?;
        info!("Loaded assembly and entry function.");

        debug!("Invoking {} with {:?}", ENTRY_METHOD_NAME, context);
        let accepted = unsafe {
            entry_point(
                context.plugin_funcs,
                context.plugin_events,
                context.plugin_info,
            )
        } != 0;

        if !accepted {
            warn!("Managed entry point {} returned false.", ENTRY_METHOD_NAME);
        }
        Ok(accepted)
    }
}

/// Reads the configuration, runs the bootstrapper and reports any failure.
/// Returns true only when the managed entry point accepted the handover.
pub fn initialize_plugin<P: HostfxrProvider + ?Sized>(
    config_path: &Path,
    provider: &P,
    context: PluginContext,
) -> bool {
    let outcome = PluginConfig::load(config_path)
        .map_err(BootstrapError::from)
        .and_then(|config| Bootstrapper::new(provider).run(&config, context));

    match outcome {
        Ok(accepted) => accepted,
        Err(e) => {
            report(&e);
            false
        }
    }
}

fn report(error: &BootstrapError) {
    for message in diagnostics(error) {
        error!("{}", message);
    }
}

/// One line per cause; every missing directive gets its own.
fn diagnostics(error: &BootstrapError) -> Vec<String> {
    match error {
        BootstrapError::Config(ConfigError::MissingDirectives(missing)) => missing
            .iter()
            .map(|directive| directive.missing_message().to_string())
            .collect(),
        other => vec![other.to_string()],
    }
}

fn to_pdcstring(value: &str) -> Result<PdCString, BootstrapError> {
    PdCString::from_os_str(value).map_err(|e| BootstrapError::InvalidString {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn null_handle() -> hostfxr_handle {
    ptr::null_mut::<c_void>() as hostfxr_handle
}

/// Owns a hostfxr handle. `close` releases it explicitly; dropping an unclosed
/// context releases it too.
struct RuntimeContext<'a> {
    exports: &'a HostfxrExports,
    handle: hostfxr_handle,
}

impl<'a> RuntimeContext<'a> {
    fn initialize(
        exports: &'a HostfxrExports,
        runtime_config: &PdCString,
    ) -> Result<Self, BootstrapError> {
        let mut handle = null_handle();
        let status = unsafe {
            (exports.initialize_for_runtime_config)(
                runtime_config.as_ptr(),
                ptr::null(),
                &mut handle,
            )
        };

        // hostfxr can return a live handle together with a non-zero status
        // (e.g. HostAlreadyInitialized). Drop still closes it.
        let context = Self { exports, handle };
        if status != 0 {
            return Err(BootstrapError::InitializeStatus { code: status });
        }
        if context.handle.is_null() {
            return Err(BootstrapError::InitializeNoHandle);
        }
        Ok(context)
    }

    fn load_assembly_and_get_function_pointer(
        &self,
    ) -> Result<load_assembly_and_get_function_pointer_fn, BootstrapError> {
        let mut delegate: *mut c_void = ptr::null_mut();
        let status = unsafe {
            (self.exports.get_runtime_delegate)(
                self.handle,
                hostfxr_delegate_type::hdt_load_assembly_and_get_function_pointer,
                &mut delegate,
            )
        };

        if status != 0 {
            return Err(BootstrapError::DelegateLoaderStatus { code: status });
        }
        if delegate.is_null() {
            return Err(BootstrapError::DelegateLoaderNull);
        }
        Ok(unsafe {
            mem::transmute::<*mut c_void, load_assembly_and_get_function_pointer_fn>(delegate)
        })
    }

    fn close(mut self) -> Result<(), BootstrapError> {
        let handle = mem::replace(&mut self.handle, null_handle());
        match unsafe { (self.exports.close)(handle) } {
            0 => Ok(()),
            code => Err(BootstrapError::Close { code }),
        }
    }
}

impl Drop for RuntimeContext<'_> {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        let status = unsafe { (self.exports.close)(self.handle) };
        if status != 0 {
            warn!(
                "hostfxr_close returned nonzero while releasing a failed context: {:#x}",
                status
            );
        } else {
            debug!("Released hostfxr handle of a failed initialization");
        }
    }
}

/// The fixed managed entry point, with every name already in the platform encoding.
struct EntryPointRequest {
    assembly_path: PdCString,
    type_name: PdCString,
    method_name: PdCString,
    delegate_type_name: PdCString,
}

impl EntryPointRequest {
    fn new(assembly_path: &str) -> Result<Self, BootstrapError> {
        Ok(Self {
            assembly_path: to_pdcstring(assembly_path)?,
            type_name: to_pdcstring(ENTRY_TYPE_NAME)?,
            method_name: to_pdcstring(ENTRY_METHOD_NAME)?,
            delegate_type_name: to_pdcstring(ENTRY_DELEGATE_TYPE_NAME)?,
        })
    }

    fn resolve(
        &self,
        loader: load_assembly_and_get_function_pointer_fn,
    ) -> Result<EntryPointFn, BootstrapError> {
        let mut delegate: *const c_void = ptr::null();
        let status = unsafe {
            loader(
                self.assembly_path.as_ptr(),
                self.type_name.as_ptr(),
                self.method_name.as_ptr(),
                self.delegate_type_name.as_ptr(),
                ptr::null_mut(),
                &mut delegate,
            )
        };

        if status != 0 {
            return Err(BootstrapError::EntryPointStatus { code: status });
        }
        if delegate.is_null() {
            return Err(BootstrapError::EntryPointNull);
        }
        Ok(unsafe { mem::transmute::<*const c_void, EntryPointFn>(delegate) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directive;
    use std::io::Cursor;

    #[test]
    fn every_missing_directive_gets_its_own_diagnostic() {
        let error = PluginConfig::parse(Cursor::new("gamemode Default\nport 8192\n"))
            .map(|_| ())
            .map_err(BootstrapError::from)
            .unwrap_err();

        assert_eq!(
            diagnostics(&error),
            vec![
                Directive::RuntimeConfig.missing_message().to_string(),
                Directive::Assembly.missing_message().to_string(),
            ]
        );
    }

    #[test]
    fn single_missing_directive_is_reported_alone() {
        let error = PluginConfig::parse(Cursor::new("dotnetrtc config.json\n"))
            .map(|_| ())
            .map_err(BootstrapError::from)
            .unwrap_err();

        assert_eq!(
            diagnostics(&error),
            vec![Directive::Assembly.missing_message().to_string()]
        );
    }

    #[test]
    fn runtime_failures_are_a_single_line() {
        let error = BootstrapError::Close { code: 0x8000_8081_u32 as i32 };
        assert_eq!(
            diagnostics(&error),
            vec!["Failed to close hostfxr handle (hostfxr_close returned nonzero: 0x80008081).".to_string()]
        );
    }
}
