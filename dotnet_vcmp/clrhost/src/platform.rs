use libloading::Library;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Failed to load library {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("Failed to resolve symbol {name}: {source}")]
    Symbol {
        name: String,
        #[source]
        source: libloading::Error,
    },
    #[error("Symbol {name} resolved to a null address")]
    NullSymbol { name: String },
}

/// A loaded shared library. Search paths and name handling are left to the OS loader.
pub struct SharedLibrary {
    library: Library,
    path: PathBuf,
}

impl SharedLibrary {
    pub fn load(path: &Path) -> Result<Self, PlatformError> {
        let library = unsafe { open(path) }.map_err(|source| PlatformError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up an exported symbol by its exact name. The address is only valid
    /// while this library stays loaded.
    pub fn resolve(&self, name: &str) -> Result<NonNull<c_void>, PlatformError> {
        let symbol = unsafe { self.library.get::<*mut c_void>(name.as_bytes()) }.map_err(
            |source| PlatformError::Symbol {
                name: name.to_string(),
                source,
            },
        )?;
        NonNull::new(*symbol).ok_or_else(|| PlatformError::NullSymbol {
            name: name.to_string(),
        })
    }
}

#[cfg(unix)]
unsafe fn open(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};
    UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL).map(Library::from)
}

#[cfg(windows)]
unsafe fn open(path: &Path) -> Result<Library, libloading::Error> {
    Library::new(path)
}
