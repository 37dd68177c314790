//! Routing decisions made before a call reaches a VM.
//!
//! Capabilities are queried once per instance. Whether a VM may receive a call depends only on
//! those capabilities, the code and the destination address; the revision is never part of the
//! decision and is passed through with each execution instead.

use crate::types::{Address, Capabilities};

/// The default upper bound of the precompile address range (`0x01..=0x0a`).
pub const DEFAULT_PRECOMPILE_MAX_ADDRESS: u16 = 0x0a;

/// The code dialects a VM can declare support for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeDialect {
    /// Ordinary EVM bytecode.
    Evm1,
    /// WebAssembly modules, recognized by their magic number.
    Ewasm,
}

impl CodeDialect {
    /// The first four bytes of every WebAssembly module.
    pub const WASM_MAGIC: [u8; 4] = *b"\0asm";

    /// Determines the dialect of `code`. Empty code is EVM bytecode.
    pub fn detect(code: &[u8]) -> Self {
        if code.starts_with(&Self::WASM_MAGIC) {
            CodeDialect::Ewasm
        } else {
            CodeDialect::Evm1
        }
    }

    /// The capability a VM needs to run code of this dialect.
    pub fn required_capability(self) -> Capabilities {
        match self {
            CodeDialect::Evm1 => Capabilities::EVM1,
            CodeDialect::Ewasm => Capabilities::EWASM,
        }
    }
}

/// Returns true if `address` falls in the precompile range `1..=max`: the top 18 bytes are
/// zero and the low 16 bits, read big-endian, are in range.
pub fn is_precompile_address(address: &Address, max: u16) -> bool {
    if address.bytes[..18].iter().any(|b| *b != 0) {
        return false;
    }
    let index = u16::from_be_bytes([address.bytes[18], address.bytes[19]]);
    (1..=max).contains(&index)
}

/// How a call is handed to a VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// The destination is a precompile; the VM runs it without code.
    Precompile,
    /// The VM runs the destination's code.
    Code(CodeDialect),
}

/// Decides whether a VM with `capabilities` may receive a call to `destination` running `code`.
///
/// A precompile destination goes to a VM that executes precompiles. Otherwise, including for
/// precompile addresses when the VM does not run precompiles, the code's dialect decides.
pub fn route_target(
    capabilities: Capabilities,
    code: &[u8],
    destination: &Address,
    precompile_max_address: u16,
) -> Option<Route> {
    if is_precompile_address(destination, precompile_max_address) &&
        capabilities.contains(Capabilities::PRECOMPILES)
    {
        return Some(Route::Precompile);
    }

    let dialect = CodeDialect::detect(code);
    capabilities.contains(dialect.required_capability()).then_some(Route::Code(dialect))
}
