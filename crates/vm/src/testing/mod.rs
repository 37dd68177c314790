//! In-memory collaborators for exercising the protocol in tests.
//!
//! Neither type implements EVM semantics: [`MockedHost`] keeps plain maps and records every
//! callback, and [`ScriptVm`] runs a handful of one-byte instructions that poke at the host.

mod host;
mod script;

pub use host::{
    MockedAccount, MockedHost, RecordedCall, RecordedLog, RecordedSelfdestruct, StorageValue,
};
pub use script::{evmc_create_script, evmc_create_static_script, opcodes, ScriptVm, StaticVm};
