//! The loader entry points with the C calling convention.
//!
//! Error codes are reported through a nullable out-parameter, and the message of the most
//! recent failure is available once through [`evmc_last_error_msg`]. Modules opened here are
//! never closed.

use std::{
    ffi::{CStr, CString},
    os::raw::c_char,
    path::Path,
    sync::Mutex,
};

use evmc_sys as ffi;
use lazy_static::lazy_static;

use crate::{
    error::{LoaderError, LoaderErrorCode},
    last_error::{take_last_error, track},
    loader::{load, load_and_configure_path, load_and_create},
    names::null_filename,
};

lazy_static! {
    /// Backing storage of the pointer returned by `evmc_last_error_msg`.
    static ref LAST_ERROR_MSG: Mutex<Option<CString>> = Mutex::new(None);
}

/// Reads the bytes of a nullable C string.
unsafe fn c_bytes<'a>(s: *const c_char) -> Result<&'a [u8], LoaderError> {
    if s.is_null() {
        return Err(null_filename());
    }
    Ok(CStr::from_ptr(s).to_bytes())
}

/// Module paths reach the dynamic linker byte for byte.
#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Result<&Path, LoaderError> {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};
    Ok(Path::new(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Result<&Path, LoaderError> {
    std::str::from_utf8(bytes)
        .map(Path::new)
        .map_err(|_| LoaderError::InvalidArgument("file name is not valid UTF-8".to_string()))
}

/// Splits a configuration string into its path and its options.
fn split_config_bytes(config: &[u8]) -> Result<(&Path, Option<&str>), LoaderError> {
    let (path, options) = match config.iter().position(|&b| b == b',') {
        Some(comma) => (&config[..comma], Some(&config[comma + 1..])),
        None => (config, None),
    };
    let options = options
        .map(std::str::from_utf8)
        .transpose()
        .map_err(|_| LoaderError::InvalidArgument("options are not valid UTF-8".to_string()))?;
    Ok((bytes_to_path(path)?, options))
}

unsafe fn report<T>(result: Result<T, LoaderError>, error_code: *mut LoaderErrorCode) -> Option<T> {
    let code = match &result {
        Ok(_) => LoaderErrorCode::Success,
        Err(e) => e.code(),
    };
    if let Some(error_code) = error_code.as_mut() {
        *error_code = code;
    }
    result.ok()
}

/// Opens the module and returns its creation function, or null.
///
/// # Safety
///
/// `filename` must be null or a valid null-terminated string, and `error_code` null or valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn evmc_load(
    filename: *const c_char,
    error_code: *mut LoaderErrorCode,
) -> Option<ffi::evmc_create_fn> {
    let result = match c_bytes(filename).and_then(bytes_to_path) {
        Ok(path) => load(path).map(|module| module.leak()),
        Err(e) => track(|| Err(e)),
    };
    report(result, error_code)
}

/// Opens the module, creates an instance and checks its ABI version. Returns null on failure.
///
/// # Safety
///
/// See [`evmc_load`].
#[no_mangle]
pub unsafe extern "C" fn evmc_load_and_create(
    filename: *const c_char,
    error_code: *mut LoaderErrorCode,
) -> *mut ffi::evmc_vm {
    let result = match c_bytes(filename).and_then(bytes_to_path) {
        Ok(path) => load_and_create(path).map(|vm| vm.into_raw()),
        Err(e) => track(|| Err(e)),
    };
    report(result, error_code).unwrap_or(std::ptr::null_mut())
}

/// Creates an instance from a `<path>[,<name>[=<value>]]*` configuration string. Returns null
/// on failure.
///
/// # Safety
///
/// `config` must be null or a valid null-terminated string, and `error_code` null or valid for
/// writes.
#[no_mangle]
pub unsafe extern "C" fn evmc_load_and_configure(
    config: *const c_char,
    error_code: *mut LoaderErrorCode,
) -> *mut ffi::evmc_vm {
    let result = match c_bytes(config).and_then(split_config_bytes) {
        Ok((path, options)) => load_and_configure_path(path, options).map(|vm| vm.into_raw()),
        Err(e) => track(|| Err(e)),
    };
    report(result, error_code).unwrap_or(std::ptr::null_mut())
}

/// Returns the message of the most recent failure once, then null until the next failure.
///
/// The pointer stays valid until the next call of this function.
#[no_mangle]
pub extern "C" fn evmc_last_error_msg() -> *const c_char {
    let mut slot = LAST_ERROR_MSG.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *slot = take_last_error()
        .map(|e| CString::new(e.to_string().replace('\0', "")).unwrap_or_default());
    slot.as_ref().map_or(std::ptr::null(), |msg| msg.as_ptr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn last_error_msg() -> Option<String> {
        let msg = evmc_last_error_msg();
        if msg.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(msg) }.to_string_lossy().into_owned())
        }
    }

    #[test]
    #[serial]
    fn test_null_path() {
        let mut ec = LoaderErrorCode::Success;
        let create_fn = unsafe { evmc_load(std::ptr::null(), &mut ec) };
        assert!(create_fn.is_none());
        assert_eq!(ec, LoaderErrorCode::InvalidArgument);
        assert_eq!(last_error_msg().as_deref(), Some("invalid argument: file name cannot be null"));
        assert_eq!(last_error_msg(), None);
    }

    #[test]
    #[serial]
    fn test_empty_path() {
        let mut ec = LoaderErrorCode::Success;
        let vm = unsafe { evmc_load_and_create(c"".as_ptr(), &mut ec) };
        assert!(vm.is_null());
        assert_eq!(ec, LoaderErrorCode::InvalidArgument);
        assert_eq!(
            last_error_msg().as_deref(),
            Some("invalid argument: file name cannot be empty")
        );
    }

    #[test]
    #[serial]
    fn test_nonexistent_path() {
        let mut ec = LoaderErrorCode::Success;
        let vm = unsafe { evmc_load_and_configure(c"nonexistent.so,verbose=1".as_ptr(), &mut ec) };
        assert!(vm.is_null());
        assert_eq!(ec, LoaderErrorCode::CannotOpen);
        let msg = last_error_msg().expect("a message for the failure");
        assert!(msg.contains("nonexistent.so"), "unexpected message: {msg}");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_non_utf8_path_reaches_the_linker() {
        let path = CString::new(b"unittests/lib\xff\xfe.so".to_vec()).expect("no interior nul");

        let mut ec = LoaderErrorCode::Success;
        let vm = unsafe { evmc_load_and_create(path.as_ptr(), &mut ec) };
        assert!(vm.is_null());
        assert_eq!(ec, LoaderErrorCode::CannotOpen);
        assert!(last_error_msg().is_some());

        let config =
            CString::new(b"unittests/lib\xff.so,verbose=1".to_vec()).expect("no interior nul");
        let vm = unsafe { evmc_load_and_configure(config.as_ptr(), &mut ec) };
        assert!(vm.is_null());
        assert_eq!(ec, LoaderErrorCode::CannotOpen);
    }

    #[test]
    #[serial]
    fn test_non_utf8_options_are_rejected() {
        let config = CString::new(b"script.so,\xff=1".to_vec()).expect("no interior nul");
        let mut ec = LoaderErrorCode::Success;
        let vm = unsafe { evmc_load_and_configure(config.as_ptr(), &mut ec) };
        assert!(vm.is_null());
        assert_eq!(ec, LoaderErrorCode::InvalidArgument);
        assert_eq!(
            last_error_msg().as_deref(),
            Some("invalid argument: options are not valid UTF-8")
        );
    }

    #[test]
    #[serial]
    fn test_null_error_code_is_allowed() {
        let vm = unsafe { evmc_load_and_create(std::ptr::null(), std::ptr::null_mut()) };
        assert!(vm.is_null());
        assert!(last_error_msg().is_some());
    }
}
