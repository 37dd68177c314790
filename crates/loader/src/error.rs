use std::fmt;

/// The stable error codes of the loader, as seen by C callers.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderErrorCode {
    /// The loader succeeded.
    Success = 0,
    /// The loader cannot open the given file name.
    CannotOpen = 1,
    /// The VM create function not found.
    SymbolNotFound = 2,
    /// The invalid argument value provided.
    InvalidArgument = 3,
    /// The creation of a VM instance has failed.
    InstanceCreationFailure = 4,
    /// The ABI version of the VM instance has mismatched.
    AbiVersionMismatch = 5,
    /// The VM option is invalid.
    InvalidOptionName = 6,
    /// The VM option value is invalid.
    InvalidOptionValue = 7,
}

impl fmt::Display for LoaderErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoaderErrorCode::Success => "success",
            LoaderErrorCode::CannotOpen => "cannot open",
            LoaderErrorCode::SymbolNotFound => "symbol not found",
            LoaderErrorCode::InvalidArgument => "invalid argument",
            LoaderErrorCode::InstanceCreationFailure => "instance creation failure",
            LoaderErrorCode::AbiVersionMismatch => "abi version mismatch",
            LoaderErrorCode::InvalidOptionName => "invalid option name",
            LoaderErrorCode::InvalidOptionValue => "invalid option value",
        };
        f.write_str(name)
    }
}

/// Error type for the loader module
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    /// The path (or configuration string) was rejected before touching the file system.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The dynamic linker could not open the module. Carries the linker's message.
    #[error("{0}")]
    CannotOpen(String),
    /// Neither the derived nor the fallback create function exists in the module.
    #[error("EVMC create function not found in {0}")]
    SymbolNotFound(String),
    /// The create function returned null.
    #[error("creating EVMC VM of {0} has failed")]
    InstanceCreationFailure(String),
    /// The instance was built against another ABI version.
    #[error("EVMC ABI version {found} of {path} mismatches the expected version {expected}")]
    AbiVersionMismatch {
        /// The module path.
        path: String,
        /// The version reported by the instance.
        found: i32,
        /// The version this loader was built against.
        expected: i32,
    },
    /// The instance has no options, or does not know the given one.
    #[error("{0}")]
    InvalidOptionName(String),
    /// The instance rejected the value of an option.
    #[error("{0}")]
    InvalidOptionValue(String),
}

impl LoaderError {
    /// The stable code of this error.
    pub fn code(&self) -> LoaderErrorCode {
        match self {
            LoaderError::InvalidArgument(_) => LoaderErrorCode::InvalidArgument,
            LoaderError::CannotOpen(_) => LoaderErrorCode::CannotOpen,
            LoaderError::SymbolNotFound(_) => LoaderErrorCode::SymbolNotFound,
            LoaderError::InstanceCreationFailure(_) => LoaderErrorCode::InstanceCreationFailure,
            LoaderError::AbiVersionMismatch { .. } => LoaderErrorCode::AbiVersionMismatch,
            LoaderError::InvalidOptionName(_) => LoaderErrorCode::InvalidOptionName,
            LoaderError::InvalidOptionValue(_) => LoaderErrorCode::InvalidOptionValue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(LoaderErrorCode::Success as i32, 0);
        assert_eq!(LoaderErrorCode::CannotOpen as i32, 1);
        assert_eq!(LoaderErrorCode::SymbolNotFound as i32, 2);
        assert_eq!(LoaderErrorCode::InvalidArgument as i32, 3);
        assert_eq!(LoaderErrorCode::InstanceCreationFailure as i32, 4);
        assert_eq!(LoaderErrorCode::AbiVersionMismatch as i32, 5);
        assert_eq!(LoaderErrorCode::InvalidOptionName as i32, 6);
        assert_eq!(LoaderErrorCode::InvalidOptionValue as i32, 7);
    }

    #[test]
    fn test_messages() {
        let e = LoaderError::AbiVersionMismatch { path: "vm.so".to_string(), found: 42, expected: 12 };
        assert_eq!(e.to_string(), "EVMC ABI version 42 of vm.so mismatches the expected version 12");
        assert_eq!(e.code(), LoaderErrorCode::AbiVersionMismatch);

        let e = LoaderError::SymbolNotFound("vm.so".to_string());
        assert_eq!(e.to_string(), "EVMC create function not found in vm.so");
    }
}
