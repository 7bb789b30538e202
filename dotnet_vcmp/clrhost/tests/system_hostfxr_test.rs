use clrhost::{HostfxrProvider, SystemHostfxr};

#[test]
#[ignore = "needs an installed .NET runtime"]
fn locates_and_loads_installed_hostfxr() {
    let _ = env_logger::builder().is_test(true).try_init();

    let path = SystemHostfxr
        .hostfxr_path()
        .expect("Failed to locate hostfxr");
    assert!(path.exists(), "hostfxr reported at {:?} does not exist", path);

    // Loading twice reuses the process-wide library.
    SystemHostfxr
        .load_hostfxr(&path)
        .expect("Failed to resolve hostfxr exports");
    SystemHostfxr
        .load_hostfxr(&path)
        .expect("Failed to resolve hostfxr exports again");
}
