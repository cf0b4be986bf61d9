//! Logging configuration with file rotation
//!
//! Output goes to stderr, to a daily rotated file, or both. Either output can
//! use the plain or the JSON formatter. `RUST_LOG` directives always take
//! precedence over the configured level.

use crate::config::LoggingConfig;
use crate::error::{LiquidCheckError, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

const DEFAULT_LOG_FILE: &str = "liquid-check.log";

/// Logging configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Log level
    pub level: Level,

    /// Log to file
    pub file_path: Option<PathBuf>,

    /// Log to stderr
    pub stderr: bool,

    /// Emit JSON lines
    pub json: bool,

    /// Include thread IDs
    pub thread_ids: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            file_path: None,
            stderr: true,
            json: false,
            thread_ids: false,
        }
    }
}

impl LogConfig {
    /// Create config from environment
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Create config from the `[logging]` table, then apply environment overrides
    pub fn from_config(logging: &LoggingConfig) -> Self {
        Self {
            level: logging.level.parse().unwrap_or(Level::INFO),
            file_path: logging.file.clone(),
            stderr: logging.stderr,
            json: logging.json_format,
            thread_ids: false,
        }
        .with_env_overrides()
    }

    /// Force debug level
    pub fn with_debug(mut self, debug: bool) -> Self {
        if debug {
            self.level = Level::DEBUG;
        }
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(rust_log) = std::env::var("RUST_LOG") {
            if let Some(level) = level_in_directives(&rust_log) {
                self.level = level;
            }
        }

        if let Ok(log_file) = std::env::var("LIQUID_CHECK_LOG_FILE") {
            self.file_path = Some(PathBuf::from(log_file));
        }

        if let Ok(log_stderr) = std::env::var("LIQUID_CHECK_LOG_STDERR") {
            self.stderr = log_stderr.to_lowercase() != "false";
        }

        if let Ok(log_json) = std::env::var("LIQUID_CHECK_LOG_JSON") {
            self.json = matches!(log_json.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        self
    }
}

/// Most verbose level named in a `RUST_LOG` string
fn level_in_directives(directives: &str) -> Option<Level> {
    [
        ("trace", Level::TRACE),
        ("debug", Level::DEBUG),
        ("info", Level::INFO),
        ("warn", Level::WARN),
        ("error", Level::ERROR),
    ]
    .into_iter()
    .find(|(name, _)| directives.to_lowercase().contains(name))
    .map(|(_, level)| level)
}

fn output_layer<W>(writer: W, ansi: bool, config: &LogConfig) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_thread_ids(config.thread_ids);

    if config.json {
        layer.json().boxed()
    } else {
        layer.boxed()
    }
}

fn file_appender(file_path: &Path) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let directory = file_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;

    Ok(tracing_appender::rolling::daily(
        directory,
        file_path
            .file_name()
            .unwrap_or_else(|| std::ffi::OsStr::new(DEFAULT_LOG_FILE)),
    ))
}

/// Initialize logging with the given configuration
pub fn init_logging(config: LogConfig) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.stderr {
        layers.push(output_layer(std::io::stderr, !config.json, &config));
    }
    if let Some(file_path) = &config.file_path {
        layers.push(output_layer(file_appender(file_path)?, false, &config));
    }

    let subscriber = tracing_subscriber::registry().with(layers).with(env_filter);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LiquidCheckError::config(format!("Failed to install logger: {e}")))?;

    Ok(())
}
