//! The EVMC call protocol.
//!
//! This crate provides both sides of the connector on top of the binary contract in `evmc-sys`:
//! the host-side [`Vm`] handle that drives an instance, the [`Host`] trait answering callbacks,
//! the VM-side [`EvmcVm`] trait and container that expose a Rust VM over the C ABI, owned result
//! handling, and capability negotiation.

/// Safe Rust counterparts of the enumerations and value types on the wire
pub mod types;

/// Execution messages and their builder
pub mod message;

/// Execution results and the ownership of their output buffers
pub mod result;

/// The host callback table and the trait backing it
pub mod host;

/// The VM's view of the host during one execution
pub mod context;

/// Exposing a Rust VM as a C-compatible instance
pub mod container;

/// The host-side handle to a VM instance
pub mod vm;

/// Capability and dialect based routing
pub mod negotiate;

mod macros;

/// In-memory host and script VMs for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// re-export the public interface
pub use container::{EvmcContainer, EvmcVm};
pub use context::ExecutionContext;
pub use host::Host;
pub use message::{ExecutionMessage, ExecutionMessageBuilder};
pub use result::{ExecutionResult, Output, RawResult};
pub use types::*;
pub use vm::Vm;

#[doc(hidden)]
pub use evmc_sys as ffi;
#[doc(hidden)]
pub use paste;
