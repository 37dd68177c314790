//! The EVMC loader locates a VM module from a file path alone, resolves its creation function by
//! naming convention, creates an instance and validates its ABI version.
//!
//! Every failure is returned as a [`LoaderError`] and also recorded in a process-wide slot that
//! [`take_last_error`] reads once, for callers that only see error codes.

/// Error types for the loader module
pub mod error;

/// Path validation and creation function name derivation
pub mod names;

/// Where creation functions are looked up
pub mod source;

/// Loading, creating and configuring VM instances
pub mod loader;

/// The C calling convention entry points
pub mod capi;

mod last_error;

// re-export the public interface
pub use error::{LoaderError, LoaderErrorCode};
pub use last_error::take_last_error;
pub use loader::{
    create_and_configure, find_create_fn, load, load_and_configure, load_and_create, LoadedModule,
};
pub use names::{create_fn_name, fallback_create_fn_name, validate_filename, PATH_MAX_LENGTH};
pub use source::{DynamicLibrary, SymbolSource, SymbolTable};
