use crate::bootstrap::HostfxrProvider;
use crate::hostfxr::HostfxrExports;
use crate::platform::SharedLibrary;
use crate::BootstrapError;
use log::debug;
use netcorehost::nethost;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

// Never unloaded: the runtime it starts lives until the process exits.
static HOSTFXR: OnceCell<SharedLibrary> = OnceCell::new();

/// Finds hostfxr through nethost and loads it from the installed .NET runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHostfxr;

impl HostfxrProvider for SystemHostfxr {
    fn hostfxr_path(&self) -> Result<PathBuf, BootstrapError> {
        // nethost retries with a larger buffer when the path does not fit.
        let path = nethost::get_hostfxr_path().map_err(|e| BootstrapError::Locate {
            code: e.value() as i32,
        })?;
        Ok(PathBuf::from(path.to_os_string()))
    }

    fn load_hostfxr(&self, path: &Path) -> Result<HostfxrExports, BootstrapError> {
        let library = HOSTFXR.get_or_try_init(|| SharedLibrary::load(path))?;
        debug!("hostfxr loaded from {}", library.path().display());
        Ok(HostfxrExports::resolve(library)?)
    }
}
