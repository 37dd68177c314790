use std::path::{Path, PathBuf};

use eyre::WrapErr;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::Directive, EnvFilter, Layer, Registry};

use crate::formatter::LogFormat;

/// A boxed tracing [`Layer`].
pub(crate) type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the background file writer alive. Buffered lines are flushed when it is dropped.
pub type FileWorkerGuard = WorkerGuard;

/// The layers a subscriber is built from.
#[derive(Default)]
pub(crate) struct Layers {
    inner: Vec<BoxedLayer<Registry>>,
}

impl std::fmt::Debug for Layers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layers").field("len", &self.inner.len()).finish()
    }
}

impl Layers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn into_inner(self) -> Vec<BoxedLayer<Registry>> {
        self.inner
    }

    /// Adds a stdout layer.
    pub(crate) fn stdout(
        &mut self,
        format: LogFormat,
        default_directive: Directive,
        filters: &str,
        color: Option<String>,
    ) -> eyre::Result<()> {
        let filter = build_env_filter(Some(default_directive), filters)?;
        self.inner.push(format.apply(filter, color, None));
        Ok(())
    }

    /// Adds a layer writing to a size-rotated file, returning the guard of its writer thread.
    pub(crate) fn file(
        &mut self,
        format: LogFormat,
        filters: &str,
        file_info: &FileInfo,
    ) -> eyre::Result<FileWorkerGuard> {
        let (writer, guard) = file_info.create_log_writer()?;
        let filter = build_env_filter(None, filters)?;
        self.inner.push(format.apply(filter, None, Some(writer)));
        Ok(guard)
    }
}

/// Where and how log files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    dir: PathBuf,
    file_name: String,
    max_size_bytes: u64,
    max_files: usize,
}

impl FileInfo {
    /// The default file name inside the log directory.
    pub const DEFAULT_FILE_NAME: &'static str = "evmc.log";

    /// Creates a new [`FileInfo`].
    pub fn new(dir: PathBuf, file_name: String, max_size_bytes: u64, max_files: usize) -> Self {
        Self { dir, file_name, max_size_bytes, max_files }
    }

    /// Logs to `dir/evmc.log`, rotating at 200 MB and keeping 5 files.
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        Self::new(dir.into(), Self::DEFAULT_FILE_NAME.to_string(), 200 * 1024 * 1024, 5)
    }

    /// The log directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The path of the active log file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    fn create_log_writer(
        &self,
    ) -> eyre::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
        std::fs::create_dir_all(&self.dir)
            .wrap_err_with(|| format!("could not create log directory {}", self.dir.display()))?;

        let appender = RollingFileAppender::new(
            self.path(),
            RollingConditionBasic::new().max_size(self.max_size_bytes),
            self.max_files,
        )
        .wrap_err("could not initialize file logging")?;

        Ok(tracing_appender::non_blocking(appender))
    }
}

/// Builds an [`EnvFilter`] from `RUST_LOG`, the optional default directive and a comma
/// separated list of extra directives.
pub(crate) fn build_env_filter(
    default_directive: Option<Directive>,
    directives: &str,
) -> eyre::Result<EnvFilter> {
    let env_filter = match default_directive {
        Some(default_directive) => {
            EnvFilter::builder().with_default_directive(default_directive).from_env_lossy()
        }
        None => EnvFilter::builder().from_env_lossy(),
    };

    directives
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .try_fold(env_filter, |env_filter, directive| {
            let directive: Directive = directive
                .parse()
                .wrap_err_with(|| format!("invalid log filter directive '{directive}'"))?;
            Ok(env_filter.add_directive(directive))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_env_filter_accepts_directives() {
        let filter = build_env_filter(Some("info".parse().expect("valid directive")), "evmc_loader=debug,")
            .expect("failed to build filter");
        let rendered = filter.to_string();
        assert!(rendered.contains("evmc_loader=debug"), "{rendered}");
    }

    #[test]
    fn test_build_env_filter_rejects_garbage() {
        let error = build_env_filter(None, "evmc_loader=loud").expect_err("must be rejected");
        assert!(error.to_string().contains("evmc_loader=loud"));
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let info = FileInfo::in_directory(dir.path().join("logs"));
        assert_eq!(info.path(), dir.path().join("logs").join("evmc.log"));

        let mut layers = Layers::new();
        let guard = layers.file(LogFormat::Json, "debug", &info).expect("failed to add file layer");
        assert!(info.dir().is_dir());
        assert_eq!(layers.into_inner().len(), 1);
        drop(guard);
    }
}
