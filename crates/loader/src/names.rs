use std::path::Path;

use tracing::debug;

use crate::error::LoaderError;

/// The prefix shared by every VM creation function.
pub const CREATE_FN_PREFIX: &str = "evmc_create_";

/// The conventional prefix of shared library file names, stripped from module names.
pub const LIB_PREFIX: &str = "lib";

/// The longest accepted path, in bytes.
pub const PATH_MAX_LENGTH: usize = 4096;

/// Checks a module path before anything is opened. `None` stands for a null path.
///
/// The length is counted in bytes of the platform encoding, so paths that are not valid UTF-8
/// are accepted.
pub fn validate_filename(path: Option<&Path>) -> Result<&Path, LoaderError> {
    let Some(path) = path else {
        return Err(null_filename());
    };
    let length = path.as_os_str().len();
    if length == 0 {
        return Err(LoaderError::InvalidArgument("file name cannot be empty".to_string()));
    }
    if length > PATH_MAX_LENGTH {
        return Err(LoaderError::InvalidArgument(format!(
            "file name is too long ({}, maximum allowed length is {})",
            length, PATH_MAX_LENGTH
        )));
    }
    Ok(path)
}

pub(crate) fn null_filename() -> LoaderError {
    LoaderError::InvalidArgument("file name cannot be null".to_string())
}

/// Derives the name of the creation function a module at `path` is expected to export.
///
/// The file name (after the last `/`) loses a leading `lib` and its extension, dashes become
/// underscores, and the result is appended to [`CREATE_FN_PREFIX`]. For example both
/// `./libmy-vm.so` and `my_vm.evm` map to `evmc_create_my_vm`.
pub fn create_fn_name(path: &str) -> String {
    let file_name = path.rsplit_once('/').map_or(path, |(_, file_name)| file_name);
    let module_name = file_name.strip_prefix(LIB_PREFIX).unwrap_or(file_name);
    let module_name = module_name.rsplit_once('.').map_or(module_name, |(stem, _)| stem);

    let name = format!("{}{}", CREATE_FN_PREFIX, module_name.replace('-', "_"));
    debug!("derived create function name '{}' from '{}'", name, path);
    name
}

/// Derives the second candidate from a primary name: only the segment after its last `_` is kept.
///
/// `evmc_create_double_prefix_aaa` falls back to `evmc_create_aaa`. Returns `None` when the
/// fallback would be the primary name again.
pub fn fallback_create_fn_name(primary: &str) -> Option<String> {
    let short_name = primary.rsplit_once('_').map(|(_, short_name)| short_name)?;
    let fallback = format!("{CREATE_FN_PREFIX}{short_name}");
    (fallback != primary).then_some(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_fn_name_strips_directory_prefix_and_extension() {
        assert_eq!(create_fn_name("./aaa.evm"), "evmc_create_aaa");
        assert_eq!(create_fn_name("libaaa.so"), "evmc_create_aaa");
        assert_eq!(create_fn_name("unittests/libaaa.so"), "evmc_create_aaa");
        assert_eq!(create_fn_name("aaa"), "evmc_create_aaa");
    }

    #[test]
    fn test_create_fn_name_folds_dashes() {
        assert_eq!(
            create_fn_name("unittests/double-prefix-aaa.evm"),
            "evmc_create_double_prefix_aaa"
        );
        assert_eq!(
            create_fn_name("unittests/double_prefix_aaa.evm"),
            "evmc_create_double_prefix_aaa"
        );
    }

    #[test]
    fn test_create_fn_name_only_strips_last_extension() {
        assert_eq!(create_fn_name("libeee.so.1"), "evmc_create_eee.so");
        assert_eq!(create_fn_name("/usr/lib/libevmone.so"), "evmc_create_evmone");
        // the directory may contain dots and dashes, only the file name matters
        assert_eq!(create_fn_name("/opt/my-vms.d/vm"), "evmc_create_vm");
    }

    #[test]
    fn test_create_fn_name_lib_prefix_only_at_start() {
        assert_eq!(create_fn_name("liblib.so"), "evmc_create_lib");
        assert_eq!(create_fn_name("mylib.so"), "evmc_create_mylib");
        assert_eq!(create_fn_name("lib/aaa.so"), "evmc_create_aaa");
    }

    #[test]
    fn test_create_fn_name_of_directory() {
        assert_eq!(create_fn_name("unittests/"), "evmc_create_");
    }

    #[test]
    fn test_fallback_create_fn_name() {
        assert_eq!(
            fallback_create_fn_name("evmc_create_double_prefix_aaa").as_deref(),
            Some("evmc_create_aaa")
        );
        assert_eq!(fallback_create_fn_name("evmc_create_eee_bbb").as_deref(), Some("evmc_create_bbb"));
        assert_eq!(fallback_create_fn_name("evmc_create_aaa"), None);
        assert_eq!(fallback_create_fn_name("evmc_create_"), None);
    }

    #[test]
    fn test_validate_filename_null_and_empty() {
        let null = validate_filename(None).expect_err("null must fail");
        assert_eq!(null.to_string(), "invalid argument: file name cannot be null");

        let empty = validate_filename(Some(Path::new(""))).expect_err("empty must fail");
        assert_eq!(empty.to_string(), "invalid argument: file name cannot be empty");
    }

    #[test]
    fn test_validate_filename_length_boundary() {
        let path = "a".repeat(PATH_MAX_LENGTH);
        assert_eq!(validate_filename(Some(Path::new(&path))), Ok(Path::new(&path)));

        let path = "a".repeat(PATH_MAX_LENGTH + 1);
        let error = validate_filename(Some(Path::new(&path))).expect_err("too long must fail");
        assert_eq!(
            error.to_string(),
            "invalid argument: file name is too long (4097, maximum allowed length is 4096)"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_filename_counts_bytes() {
        use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

        // 0xff is not UTF-8 and still counts as a single byte
        let mut bytes = vec![b'a'; PATH_MAX_LENGTH - 1];
        bytes.push(0xff);
        let path = Path::new(OsStr::from_bytes(&bytes));
        assert_eq!(validate_filename(Some(path)), Ok(path));

        bytes.push(0xfe);
        let path = Path::new(OsStr::from_bytes(&bytes));
        assert!(validate_filename(Some(path)).is_err());
    }
}
