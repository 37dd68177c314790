//! Host-side routing of calls across loaded EVMC VMs.
//!
//! A [`VmRegistry`] holds the VMs in routing order and decides, per call, which of them may
//! run it: precompile destinations go to VMs that execute precompiles, other calls go to the
//! VMs supporting the code's dialect, and a VM that rejects a call hands it on to the next
//! one. A [`Dispatcher`] wraps a world state and feeds nested calls back into the registry.

/// Error types for the host module
pub mod error;

/// The ordered VM registry and its routing
pub mod registry;

/// A host executing nested calls through a registry
pub mod dispatcher;

use eyre::WrapErr;
use evmc_config::Configuration;
use evmc_tracing::{FileWorkerGuard, Tracer, Verbosity};
use tracing::info;

// re-export the public interface
pub use dispatcher::Dispatcher;
pub use error::Error;
pub use registry::VmRegistry;

/// Installs the configured logging and loads every configured module.
///
/// Keep the returned guard alive for as long as logs should reach the log file.
pub fn bootstrap(
    config: &Configuration,
    verbosity: Verbosity,
) -> eyre::Result<(VmRegistry, Option<FileWorkerGuard>)> {
    let guard = config.log.tracer(verbosity).init().wrap_err("failed to initialize tracing")?;
    let registry = VmRegistry::from_config(config).wrap_err("failed to load VM modules")?;
    info!("loaded {} VM module(s), default revision {}", registry.len(), config.default_revision);
    Ok((registry, guard))
}
