use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use evmc_sys as ffi;
use tracing::{debug, trace};

use crate::error::LoaderError;

/// Somewhere creation functions can be looked up by name.
///
/// A source stays alive as long as any VM created from it, so implementations may own the code
/// the functions point into.
pub trait SymbolSource: Send + Sync + 'static {
    /// Returns the creation function exported under `symbol`, if any.
    fn create_fn(&self, symbol: &str) -> Option<ffi::evmc_create_fn>;
}

/// A shared module opened through the operating system's dynamic linker.
pub struct DynamicLibrary {
    library: libloading::Library,
    path: PathBuf,
}

impl DynamicLibrary {
    /// Opens the module at `path`. Failures carry the dynamic linker's message.
    ///
    /// The path is handed to the linker as is, whatever its encoding.
    pub fn open(path: &Path) -> Result<Self, LoaderError> {
        // SAFETY: running the module's initializers is the point of loading a VM module
        let library = unsafe { libloading::Library::new(path) }
            .map_err(|e| LoaderError::CannotOpen(e.to_string()))?;
        debug!("opened module {}", path.display());
        Ok(DynamicLibrary { library, path: path.to_path_buf() })
    }

    /// The path the module was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for DynamicLibrary {
    fn create_fn(&self, symbol: &str) -> Option<ffi::evmc_create_fn> {
        // SAFETY: every `evmc_create_*` symbol has the signature of `evmc_create_fn`
        let create_fn = unsafe { self.library.get::<ffi::evmc_create_fn>(symbol.as_bytes()) }
            .map(|symbol| *symbol);
        trace!("looked up '{}' in {}: {}", symbol, self.path.display(), create_fn.is_ok());
        create_fn.ok()
    }
}

impl fmt::Debug for DynamicLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicLibrary").field("path", &self.path).finish()
    }
}

/// An in-process table of creation functions, for VMs linked statically into the host.
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, ffi::evmc_create_fn>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `create_fn` under `symbol`.
    pub fn with_symbol(mut self, symbol: impl Into<String>, create_fn: ffi::evmc_create_fn) -> Self {
        self.symbols.insert(symbol.into(), create_fn);
        self
    }
}

impl SymbolSource for SymbolTable {
    fn create_fn(&self, symbol: &str) -> Option<ffi::evmc_create_fn> {
        self.symbols.get(symbol).copied()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.symbols.keys()).finish()
    }
}
