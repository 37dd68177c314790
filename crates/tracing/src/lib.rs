//! Tracing setup for the evmc connector crates.
//!
//! Library crates only emit events through [`tracing`]; binaries and test harnesses pick how
//! they are rendered here. An [`EvmcTracer`] combines a stdout layer with an optional
//! size-rotated file layer, each with its own [`LogFormat`] and filter.
//!
//! ```no_run
//! use evmc_tracing::{EvmcTracer, LayerInfo, LogFormat, Tracer, Verbosity};
//!
//! let stdout = LayerInfo::new(
//!     LogFormat::Terminal,
//!     Verbosity::new(3, false).directive().to_string(),
//!     "evmc_loader=trace".to_string(),
//!     Some("always".to_string()),
//! );
//! let _guard = EvmcTracer::new().with_stdout(stdout).init().expect("failed to init tracing");
//! ```

// re-export tracing crates
pub use tracing;
pub use tracing_subscriber;

mod formatter;
mod layers;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter::Directive, prelude::*, EnvFilter};

// re-export the public interface
pub use formatter::LogFormat;
pub use layers::{FileInfo, FileWorkerGuard};

use crate::layers::Layers;

/// Installs a global subscriber.
pub trait Tracer {
    /// Installs the subscriber, returning the guard of the file writer if one was configured.
    ///
    /// Installing twice is not an error: the first subscriber stays in place.
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>>;
}

/// Builds the process-wide subscriber from a stdout layer and an optional file layer.
#[derive(Debug, Clone)]
pub struct EvmcTracer {
    stdout: LayerInfo,
    file: Option<(LayerInfo, FileInfo)>,
}

impl EvmcTracer {
    /// A tracer logging at `INFO` to stdout in the terminal format.
    pub fn new() -> Self {
        Self { stdout: LayerInfo::default(), file: None }
    }

    /// Replaces the stdout layer.
    pub fn with_stdout(mut self, config: LayerInfo) -> Self {
        self.stdout = config;
        self
    }

    /// Adds a file layer.
    pub fn with_file(mut self, config: LayerInfo, file_info: FileInfo) -> Self {
        self.file = Some((config, file_info));
        self
    }
}

impl Default for EvmcTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for EvmcTracer {
    fn init(self) -> eyre::Result<Option<FileWorkerGuard>> {
        let mut layers = Layers::new();

        layers.stdout(
            self.stdout.format,
            self.stdout.default_directive.parse()?,
            &self.stdout.filters,
            self.stdout.color,
        )?;

        let file_guard = match &self.file {
            Some((config, file_info)) => {
                Some(layers.file(config.format, &config.filters, file_info)?)
            }
            None => None,
        };

        // a subscriber installed earlier keeps precedence
        let _ = tracing_subscriber::registry().with(layers.into_inner()).try_init();
        Ok(file_guard)
    }
}

/// The configuration of a single layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    format: LogFormat,
    default_directive: String,
    filters: String,
    color: Option<String>,
}

impl LayerInfo {
    /// Creates a new [`LayerInfo`].
    ///
    /// `default_directive` applies when `RUST_LOG` is unset, `filters` is a comma separated
    /// list of extra directives, and `color` is `always`, `auto` or `never` (`None` for no
    /// colors at all).
    pub fn new(
        format: LogFormat,
        default_directive: String,
        filters: String,
        color: Option<String>,
    ) -> Self {
        Self { format, default_directive, filters, color }
    }

    /// The output format of the layer.
    pub fn format(&self) -> LogFormat {
        self.format
    }
}

impl Default for LayerInfo {
    fn default() -> Self {
        Self {
            format: LogFormat::Terminal,
            default_directive: LevelFilter::INFO.to_string(),
            filters: String::new(),
            color: Some("always".to_string()),
        }
    }
}

/// How much to log, as given by a repeated `-v` flag.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Verbosity {
    verbosity: u8,
    quiet: bool,
}

impl Verbosity {
    /// `verbosity` counts the `-v` flags: 1 is warnings, 2 info, 3 debug and 4 or more trace.
    pub fn new(verbosity: u8, quiet: bool) -> Self {
        Self { verbosity, quiet }
    }

    /// The level directive for this verbosity, `off` when quiet.
    pub fn directive(&self) -> Directive {
        if self.quiet {
            return LevelFilter::OFF.into();
        }

        match self.verbosity.saturating_sub(1) {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
        .into()
    }
}

/// Installs a stderr subscriber filtered by `RUST_LOG` for tests. Later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_directives() {
        assert_eq!(Verbosity::new(0, false).directive().to_string(), "warn");
        assert_eq!(Verbosity::new(1, false).directive().to_string(), "warn");
        assert_eq!(Verbosity::new(2, false).directive().to_string(), "info");
        assert_eq!(Verbosity::new(3, false).directive().to_string(), "debug");
        assert_eq!(Verbosity::new(9, false).directive().to_string(), "trace");
        assert_eq!(Verbosity::new(4, true).directive().to_string(), "off");
    }

    #[test]
    fn test_init_returns_file_guard() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let guard = EvmcTracer::new()
            .with_stdout(LayerInfo::new(
                LogFormat::Terminal,
                "warn".to_string(),
                String::new(),
                None,
            ))
            .with_file(
                LayerInfo::new(LogFormat::LogFmt, "debug".to_string(), "debug".to_string(), None),
                FileInfo::in_directory(dir.path()),
            )
            .init()
            .expect("failed to init tracing");
        assert!(guard.is_some());
    }

    #[test]
    fn test_init_rejects_invalid_default_directive() {
        let result = EvmcTracer::new()
            .with_stdout(LayerInfo::new(
                LogFormat::Json,
                "evmc=loud".to_string(),
                String::new(),
                None,
            ))
            .init();
        assert!(result.is_err());
    }

    #[test]
    fn test_init_test_tracing_twice() {
        init_test_tracing();
        init_test_tracing();
    }
}
