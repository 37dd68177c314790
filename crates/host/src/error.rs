//! Error types for the host module

use evmc_loader::LoaderError;

/// Errors that can occur while setting up the host side
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A configured module could not be loaded or configured
    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    /// The configuration could not be read
    #[error("Config error: {0}")]
    Config(#[from] evmc_config::error::Error),
}
