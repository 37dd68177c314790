use std::path::Path;

use evmc_sys as ffi;
use evmc_vm::{SetOptionError, Vm};
use tracing::{debug, info};

use crate::{
    error::LoaderError,
    last_error::track,
    names::{create_fn_name, fallback_create_fn_name, validate_filename},
    source::{DynamicLibrary, SymbolSource},
};

/// A module that has been opened and whose creation function has been found.
#[derive(Debug)]
pub struct LoadedModule<S: SymbolSource = DynamicLibrary> {
    path: String,
    create_fn: ffi::evmc_create_fn,
    source: S,
}

impl<S: SymbolSource> LoadedModule<S> {
    /// The path the module was loaded from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The creation function. It points into the module, so it must not be called after the
    /// module has been dropped.
    pub fn create_fn(&self) -> ffi::evmc_create_fn {
        self.create_fn
    }

    /// Gives up the module handle, keeping the module mapped for the rest of the process.
    pub fn leak(self) -> ffi::evmc_create_fn {
        std::mem::forget(self.source);
        self.create_fn
    }

    /// Creates an instance and checks its ABI version. The returned handle keeps the module
    /// alive.
    pub fn create(self) -> Result<Vm, LoaderError> {
        // SAFETY: the function was exported under an `evmc_create_*` name
        let instance = unsafe { (self.create_fn)() };
        if instance.is_null() {
            return Err(LoaderError::InstanceCreationFailure(self.path));
        }

        // SAFETY: non-null instance freshly returned by its creation function
        let abi_version = unsafe { (*instance).abi_version };
        if abi_version != ffi::EVMC_ABI_VERSION {
            debug!(
                "destroying instance of {} built for ABI version {}",
                self.path, abi_version
            );
            // SAFETY: `abi_version` and `destroy` have kept their offsets in every ABI version
            // so far, and the instance is ours to destroy and never used again
            unsafe {
                if let Some(destroy) = (*instance).destroy {
                    destroy(instance);
                }
            }
            return Err(LoaderError::AbiVersionMismatch {
                path: self.path,
                found: abi_version,
                expected: ffi::EVMC_ABI_VERSION,
            });
        }

        // SAFETY: the ABI version matches and the module outlives the handle
        let vm = unsafe { Vm::from_raw_with_library(instance, Box::new(self.source)) }
            .ok_or(LoaderError::InstanceCreationFailure(self.path))?;
        info!("created VM '{}' {}", vm.name(), vm.version());
        Ok(vm)
    }
}

/// Looks up the creation function of the module at `path` in `source`, trying the derived
/// name first and its fallback second.
pub fn find_create_fn<S: SymbolSource>(
    source: S,
    path: &str,
) -> Result<LoadedModule<S>, LoaderError> {
    let primary = create_fn_name(path);
    let create_fn = source.create_fn(&primary).or_else(|| {
        let fallback = fallback_create_fn_name(&primary)?;
        debug!("'{}' not found, trying '{}'", primary, fallback);
        source.create_fn(&fallback)
    });

    match create_fn {
        Some(create_fn) => Ok(LoadedModule { path: path.to_string(), create_fn, source }),
        None => Err(LoaderError::SymbolNotFound(path.to_string())),
    }
}

/// Opens the module at `path` and finds its creation function.
///
/// On failure the error is also recorded for [`take_last_error`](crate::take_last_error).
pub fn load(path: impl AsRef<Path>) -> Result<LoadedModule, LoaderError> {
    track(|| open_module(path.as_ref()))
}

/// Opens the module at `path`, creates a VM instance and checks its ABI version.
///
/// On failure the error is also recorded for [`take_last_error`](crate::take_last_error).
pub fn load_and_create(path: impl AsRef<Path>) -> Result<Vm, LoaderError> {
    track(|| open_module(path.as_ref())?.create())
}

/// Creates a VM from a configuration string `<path>[,<name>[=<value>]]*` and applies every
/// option in order. An option without `=` is set to the empty string.
///
/// On failure the instance is destroyed and the error is also recorded for
/// [`take_last_error`](crate::take_last_error).
pub fn load_and_configure(config: &str) -> Result<Vm, LoaderError> {
    let (path, options) = split_config(config);
    load_and_configure_path(Path::new(path), options)
}

/// [`load_and_configure`] with the path and the comma separated options already split apart.
pub(crate) fn load_and_configure_path(
    path: &Path,
    options: Option<&str>,
) -> Result<Vm, LoaderError> {
    track(|| {
        let vm = open_module(path)?.create()?;
        configure(vm, &path.to_string_lossy(), options)
    })
}

/// Like [`load_and_configure`], resolving the module path in `source` instead of opening it.
pub fn create_and_configure<S: SymbolSource>(source: S, config: &str) -> Result<Vm, LoaderError> {
    track(|| {
        let (path, options) = split_config(config);
        validate_filename(Some(Path::new(path)))?;
        configure(find_create_fn(source, path)?.create()?, path, options)
    })
}

fn open_module(path: &Path) -> Result<LoadedModule, LoaderError> {
    let path = validate_filename(Some(path))?;
    let library = DynamicLibrary::open(path)?;
    // a name that is not UTF-8 derives a symbol no module exports
    find_create_fn(library, &path.to_string_lossy())
}

fn split_config(config: &str) -> (&str, Option<&str>) {
    match config.split_once(',') {
        Some((path, options)) => (path, Some(options)),
        None => (config, None),
    }
}

fn configure(mut vm: Vm, path: &str, options: Option<&str>) -> Result<Vm, LoaderError> {
    let Some(options) = options else {
        return Ok(vm);
    };

    for option in options.split(',') {
        let (name, value) = option.split_once('=').unwrap_or((option, ""));
        debug!("setting option '{}' = '{}' of {}", name, value, path);

        match vm.set_option(name, value) {
            Ok(()) => {}
            Err(SetOptionError::NotSupported) => {
                return Err(LoaderError::InvalidOptionName(format!(
                    "{} ({}) does not support any options",
                    path,
                    vm.name()
                )));
            }
            Err(SetOptionError::InvalidName) => {
                return Err(LoaderError::InvalidOptionName(format!(
                    "{} ({}): unknown option '{}'",
                    path,
                    vm.name(),
                    name
                )));
            }
            Err(SetOptionError::InvalidValue) => {
                return Err(LoaderError::InvalidOptionValue(format!(
                    "{} ({}): unsupported value '{}' for option '{}'",
                    path,
                    vm.name(),
                    value,
                    name
                )));
            }
        }
    }

    Ok(vm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{source::SymbolTable, take_last_error, LoaderErrorCode};
    use evmc_vm::testing::{evmc_create_script, evmc_create_static_script};
    use serial_test::serial;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DESTROYED: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn create_null() -> *mut ffi::evmc_vm {
        std::ptr::null_mut()
    }

    extern "C" fn create_abi_42() -> *mut ffi::evmc_vm {
        let instance = evmc_create_script();
        unsafe { (*instance).abi_version = 42 };
        instance
    }

    extern "C" fn destroy_counted(instance: *mut ffi::evmc_vm) {
        DESTROYED.fetch_add(1, Ordering::SeqCst);
        drop(unsafe { Box::from_raw(instance) });
    }

    /// An instance of a future ABI that only shares the leading fields.
    extern "C" fn create_abi_99() -> *mut ffi::evmc_vm {
        Box::into_raw(Box::new(ffi::evmc_vm {
            abi_version: 99,
            name: c"future".as_ptr(),
            version: c"99.0.0".as_ptr(),
            destroy: Some(destroy_counted),
            execute: None,
            get_capabilities: None,
            set_option: None,
        }))
    }

    #[test]
    fn test_find_primary_symbol() {
        let table = SymbolTable::new().with_symbol("evmc_create_aaa", evmc_create_script);
        for path in ["./aaa.evm", "libaaa.so", "unittests/libaaa.so", "aaa"] {
            let module = find_create_fn(table.clone(), path).expect("failed to find symbol");
            assert_eq!(module.path(), path);
        }
    }

    #[test]
    fn test_find_fallback_symbol() {
        let table = SymbolTable::new().with_symbol("evmc_create_aaa", evmc_create_script);
        for path in ["unittests/double-prefix-aaa.evm", "unittests/double_prefix_aaa.evm"] {
            let vm = find_create_fn(table.clone(), path)
                .expect("failed to find fallback symbol")
                .create()
                .expect("failed to create VM");
            assert_eq!(vm.name(), "script");
        }
    }

    #[test]
    fn test_primary_symbol_wins_over_fallback() {
        let table = SymbolTable::new()
            .with_symbol("evmc_create_eee_bbb", evmc_create_static_script)
            .with_symbol("evmc_create_bbb", evmc_create_script);
        let vm = find_create_fn(table, "libeee-bbb.so")
            .expect("failed to find symbol")
            .create()
            .expect("failed to create VM");
        assert_eq!(vm.name(), "static_script");
    }

    #[test]
    fn test_symbol_not_found() {
        // the fallback keeps the last name segment, so the bare `evmc_create` is never tried
        let table = SymbolTable::new().with_symbol("evmc_create", evmc_create_script);
        for path in ["unittests/libaaa.so", "unittests/libaaa_bbb.so"] {
            let error = find_create_fn(table.clone(), path).expect_err("must not resolve");
            assert_eq!(error.code(), LoaderErrorCode::SymbolNotFound);
            assert_eq!(error.to_string(), format!("EVMC create function not found in {path}"));
        }
    }

    #[test]
    fn test_instance_creation_failure() {
        let table = SymbolTable::new().with_symbol("evmc_create_aaa", create_null);
        let error = find_create_fn(table, "aaa.evm")
            .expect("failed to find symbol")
            .create()
            .expect_err("null instance must fail");
        assert_eq!(error.code(), LoaderErrorCode::InstanceCreationFailure);
        assert_eq!(error.to_string(), "creating EVMC VM of aaa.evm has failed");
    }

    #[test]
    fn test_abi_version_mismatch() {
        let table = SymbolTable::new().with_symbol("evmc_create_aaa", create_abi_42);
        let error = find_create_fn(table, "unittests/libaaa.so")
            .expect("failed to find symbol")
            .create()
            .expect_err("mismatched ABI must fail");
        assert_eq!(
            error,
            LoaderError::AbiVersionMismatch {
                path: "unittests/libaaa.so".to_string(),
                found: 42,
                expected: ffi::EVMC_ABI_VERSION,
            }
        );
        assert_eq!(
            error.to_string(),
            format!(
                "EVMC ABI version 42 of unittests/libaaa.so mismatches the expected version {}",
                ffi::EVMC_ABI_VERSION
            )
        );
    }

    #[test]
    fn test_abi_version_mismatch_destroys_instance_once() {
        let before = DESTROYED.load(Ordering::SeqCst);
        let table = SymbolTable::new().with_symbol("evmc_create_future", create_abi_99);
        let error = find_create_fn(table, "libfuture.so")
            .expect("failed to find symbol")
            .create()
            .expect_err("mismatched ABI must fail");
        assert_eq!(error.code(), LoaderErrorCode::AbiVersionMismatch);
        assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    #[serial]
    fn test_configure_applies_options() {
        let table = SymbolTable::new().with_symbol("evmc_create_script", evmc_create_script);
        let vm = create_and_configure(table, "libscript.so,verbose=true,gas-per-op=2")
            .expect("failed to configure VM");
        assert_eq!(vm.name(), "script");
        assert_eq!(take_last_error(), None);
    }

    #[test]
    #[serial]
    fn test_configure_without_option_support() {
        let table =
            SymbolTable::new().with_symbol("evmc_create_static_script", evmc_create_static_script);
        let error = create_and_configure(table, "static_script.so,verbose=true")
            .expect_err("options must be rejected");
        assert_eq!(error.code(), LoaderErrorCode::InvalidOptionName);
        assert_eq!(error.to_string(), "static_script.so (static_script) does not support any options");
        assert_eq!(take_last_error(), Some(error));

        // no options at all is fine
        let table =
            SymbolTable::new().with_symbol("evmc_create_static_script", evmc_create_static_script);
        assert!(create_and_configure(table, "static_script.so").is_ok());
    }

    #[test]
    #[serial]
    fn test_configure_unknown_option_and_bad_value() {
        let table = SymbolTable::new().with_symbol("evmc_create_script", evmc_create_script);

        let error = create_and_configure(table.clone(), "script.so,colour=blue")
            .expect_err("unknown option must fail");
        assert_eq!(error.code(), LoaderErrorCode::InvalidOptionName);
        assert_eq!(error.to_string(), "script.so (script): unknown option 'colour'");

        let error = create_and_configure(table.clone(), "script.so,verbose")
            .expect_err("empty value must fail");
        assert_eq!(error.code(), LoaderErrorCode::InvalidOptionValue);
        assert_eq!(error.to_string(), "script.so (script): unsupported value '' for option 'verbose'");

        let error = create_and_configure(table, "script.so,verbose=true,gas-per-op=lots")
            .expect_err("bad value must fail");
        assert_eq!(
            error.to_string(),
            "script.so (script): unsupported value 'lots' for option 'gas-per-op'"
        );
    }

    #[test]
    #[serial]
    fn test_configure_rejects_empty_path() {
        let table = SymbolTable::new();
        let error = create_and_configure(table, ",verbose=true").expect_err("empty path");
        assert_eq!(error.to_string(), "invalid argument: file name cannot be empty");
        assert_eq!(take_last_error(), Some(error));
    }
}
