//! .NET CoreCLR hosting for the VC:MP plugin bridge

mod bootstrap;
mod config;
pub mod diagnostics;
mod hosting;
pub mod hostfxr;
mod platform;

pub use bootstrap::{
    initialize_plugin, Bootstrapper, HostfxrProvider, PluginContext, ENTRY_DELEGATE_TYPE_NAME,
    ENTRY_METHOD_NAME, ENTRY_TYPE_NAME,
};
pub use config::{ConfigError, Directive, PluginConfig, SERVER_CONFIG_FILE};
pub use hosting::SystemHostfxr;
pub use platform::{PlatformError, SharedLibrary};

/// Everything that can stop the runtime handover. Status codes are the raw
/// hostfxr return values.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("Failed to get hostfxr path (get_hostfxr_path returned nonzero: {code:#x}).")]
    Locate { code: i32 },
    #[error("Cannot pass {value:?} to hostfxr: {reason}")]
    InvalidString { value: String, reason: String },
    #[error("Failed to initialize hostfxr (hostfxr_initialize_for_runtime_config returned nonzero: {code:#x}).")]
    InitializeStatus { code: i32 },
    #[error("Failed to initialize hostfxr (hostfxr_initialize_for_runtime_config did not return handle).")]
    InitializeNoHandle,
    #[error("Failed to retrieve load_assembly_and_get_function_pointer delegate (hostfxr_get_runtime_delegate returned nonzero: {code:#x}).")]
    DelegateLoaderStatus { code: i32 },
    #[error("Failed to retrieve load_assembly_and_get_function_pointer delegate (hostfxr_get_runtime_delegate did not return handle).")]
    DelegateLoaderNull,
    #[error("Failed to close hostfxr handle (hostfxr_close returned nonzero: {code:#x}).")]
    Close { code: i32 },
    #[error("Failed to load assembly and get entry function (load_assembly_and_get_function_pointer returned nonzero: {code:#x}).")]
    EntryPointStatus { code: i32 },
    #[error("Failed to load assembly and get entry function (load_assembly_and_get_function_pointer did not return handle).")]
    EntryPointNull,
}
