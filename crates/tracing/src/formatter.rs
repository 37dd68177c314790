use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_appender::non_blocking::NonBlocking;
use tracing_subscriber::{registry::LookupSpan, EnvFilter, Layer};

use crate::layers::BoxedLayer;

/// The output format of a log layer.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines, optionally colored.
    #[default]
    Terminal,

    /// One JSON object per event.
    Json,

    /// `key=value` pairs, see <https://brandur.org/logfmt>.
    LogFmt,
}

impl LogFormat {
    /// Builds a layer of this format that writes to `file_writer`, or to stdout when there is
    /// none.
    ///
    /// Colors are only emitted when `color` is set to something other than `never`, and
    /// `RUST_LOG_STYLE` overrides it.
    pub fn apply<S>(
        &self,
        filter: EnvFilter,
        color: Option<String>,
        file_writer: Option<NonBlocking>,
    ) -> BoxedLayer<S>
    where
        S: Subscriber,
        for<'a> S: LookupSpan<'a>,
    {
        let ansi = match color {
            Some(color) => std::env::var("RUST_LOG_STYLE")
                .map(|style| style != "never")
                .unwrap_or(color != "never"),
            None => false,
        };
        let target = std::env::var("RUST_LOG_TARGET")
            .map(|target| target != "0")
            .unwrap_or(*self != LogFormat::Terminal);

        match self {
            LogFormat::Json => {
                let layer = tracing_subscriber::fmt::layer().json().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
            LogFormat::LogFmt => {
                let layer = tracing_logfmt::builder().layer();
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
            LogFormat::Terminal => {
                let layer = tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(target);
                match file_writer {
                    Some(writer) => layer.with_writer(writer).with_filter(filter).boxed(),
                    None => layer.with_filter(filter).boxed(),
                }
            }
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Terminal => write!(f, "terminal"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::LogFmt => write!(f, "logfmt"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" => Ok(LogFormat::Terminal),
            "json" => Ok(LogFormat::Json),
            "logfmt" => Ok(LogFormat::LogFmt),
            _ => Err(format!("invalid log format: {s}")),
        }
    }
}
