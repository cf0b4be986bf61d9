//! Error types for the Liquid-Check integration
//!
//! Two layers are modelled here. [`TransportError`] describes the failure of a
//! single HTTP call against a device. [`LiquidCheckError`] is the crate-wide
//! error, which wraps transport failures and adds the refresh, configuration
//! and lookup failures of the layers above the client. Structured error codes
//! and the [`ErrorReporter`] feed the `tracing` pipeline.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Liquid-Check operations
pub type Result<T> = std::result::Result<T, LiquidCheckError>;

/// Failure of a single HTTP call against a device
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request did not complete within the client timeout
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The device could not be reached
    #[error("Connection to {url} failed: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered with something other than HTTP 200
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body was not valid JSON
    #[error("Malformed response body from {url}: {source}")]
    MalformedBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Any other request failure (body read, redirect, builder errors)
    #[error("HTTP request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl TransportError {
    /// Classify a `reqwest` failure for the given URL
    pub fn from_reqwest(url: &str, timeout: Duration, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
                timeout,
            }
        } else if err.is_connect() {
            Self::Connection {
                url: url.to_string(),
                source: err,
            }
        } else {
            Self::Request {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Connection { url, .. }
            | Self::Status { url, .. }
            | Self::MalformedBody { url, .. }
            | Self::Request { url, .. } => url,
        }
    }

    /// Map to a structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            Self::Timeout { .. } => ErrorCode::ConnectionTimeout,
            Self::Connection { .. } => ErrorCode::ConnectionRefused,
            Self::Status { .. } => ErrorCode::DeviceRejected,
            Self::MalformedBody { .. } => ErrorCode::ParsingFailed,
            Self::Request { .. } => ErrorCode::RequestFailed,
        }
    }
}

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum LiquidCheckError {
    /// A single HTTP call failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A coordinator refresh failed; the previous snapshot is kept
    #[error("Refresh failed for {host}: {source}")]
    RefreshFailed {
        host: String,
        #[source]
        source: Box<LiquidCheckError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown device or entity
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("Config file parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

/// Structured error code for machine-readable error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Connection errors (1000-1099)
    ConnectionTimeout,
    ConnectionRefused,
    RequestFailed,

    // Configuration errors (1200-1299)
    ConfigurationInvalid,

    // Device errors (1300-1399)
    DeviceNotFound,
    DeviceRejected,

    // Data errors (1400-1499)
    ParsingFailed,
    InvalidInput,

    // Service errors (1600-1699)
    RefreshFailed,

    // Internal errors (1900-1999)
    InternalError,
}

impl ErrorCode {
    /// Get numeric error code
    pub fn as_number(&self) -> u32 {
        match self {
            ErrorCode::ConnectionTimeout => 1001,
            ErrorCode::ConnectionRefused => 1002,
            ErrorCode::RequestFailed => 1003,

            ErrorCode::ConfigurationInvalid => 1202,

            ErrorCode::DeviceNotFound => 1301,
            ErrorCode::DeviceRejected => 1303,

            ErrorCode::ParsingFailed => 1401,
            ErrorCode::InvalidInput => 1402,

            ErrorCode::RefreshFailed => 1601,

            ErrorCode::InternalError => 1901,
        }
    }

    /// Get error category
    pub fn category(&self) -> &'static str {
        match self.as_number() {
            1000..=1099 => "connection",
            1200..=1299 => "configuration",
            1300..=1399 => "device",
            1400..=1499 => "data",
            1600..=1699 => "service",
            1900..=1999 => "internal",
            _ => "unknown",
        }
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Low severity - information only
    Info,
    /// Medium severity - warning condition
    Warning,
    /// High severity - error condition
    Error,
    /// Critical severity - immediate attention required
    Critical,
}

/// Structured error context with additional metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Error code for machine processing
    pub code: ErrorCode,
    /// Component that generated the error
    pub component: String,
    /// Operation that was being performed
    pub operation: String,
    /// Additional metadata about the error
    pub metadata: HashMap<String, serde_json::Value>,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Request/session ID for correlation
    pub correlation_id: Option<String>,
}

impl ErrorContext {
    /// Create new error context
    pub fn new(code: ErrorCode, component: &str, operation: &str) -> Self {
        Self {
            code,
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
            timestamp: chrono::Utc::now(),
            correlation_id: None,
        }
    }

    /// Add metadata to error context
    pub fn with_metadata<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Set correlation ID for request tracking
    pub fn with_correlation_id<S: Into<String>>(mut self, id: S) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Error representation for logging and status output
#[derive(Debug, Clone, Serialize)]
pub struct StructuredError {
    /// Error code for machine processing
    pub code: ErrorCode,
    /// Numeric error code
    pub code_number: u32,
    /// Error category
    pub category: &'static str,
    /// Error message including the cause chain
    pub message: String,
    /// Component that generated the error
    pub component: String,
    /// Operation that was being performed
    pub operation: String,
    /// Additional context metadata
    pub metadata: HashMap<String, serde_json::Value>,
    /// Error severity level
    pub severity: ErrorSeverity,
    /// Timestamp when error occurred
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Request/session ID for correlation
    pub correlation_id: Option<String>,
}

impl LiquidCheckError {
    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Generic(anyhow::anyhow!(msg.into()))
    }

    /// Wrap a failure encountered while refreshing `host`
    pub fn refresh_failed<S: Into<String>>(host: S, cause: LiquidCheckError) -> Self {
        Self::RefreshFailed {
            host: host.into(),
            source: Box::new(cause),
        }
    }

    /// True if this is a wrapped refresh failure
    pub fn is_refresh_failure(&self) -> bool {
        matches!(self, LiquidCheckError::RefreshFailed { .. })
    }

    /// The transport failure at the root of this error, if any
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            LiquidCheckError::Transport(err) => Some(err),
            LiquidCheckError::RefreshFailed { source, .. } => source.transport(),
            _ => None,
        }
    }

    /// Map to structured error code
    pub fn to_error_code(&self) -> ErrorCode {
        match self {
            LiquidCheckError::Transport(err) => err.to_error_code(),
            LiquidCheckError::RefreshFailed { .. } => ErrorCode::RefreshFailed,
            LiquidCheckError::Config(_) => ErrorCode::ConfigurationInvalid,
            LiquidCheckError::Toml(_) => ErrorCode::ConfigurationInvalid,
            LiquidCheckError::InvalidInput(_) => ErrorCode::InvalidInput,
            LiquidCheckError::NotFound(_) => ErrorCode::DeviceNotFound,
            LiquidCheckError::Io(_) => ErrorCode::InternalError,
            LiquidCheckError::Generic(_) => ErrorCode::InternalError,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LiquidCheckError::Transport(_) => ErrorSeverity::Warning,
            LiquidCheckError::RefreshFailed { .. } => ErrorSeverity::Error,
            LiquidCheckError::Config(_) | LiquidCheckError::Toml(_) => ErrorSeverity::Error,
            LiquidCheckError::InvalidInput(_) | LiquidCheckError::NotFound(_) => {
                ErrorSeverity::Warning
            }
            LiquidCheckError::Io(_) => ErrorSeverity::Error,
            LiquidCheckError::Generic(_) => ErrorSeverity::Critical,
        }
    }

    /// Message with the full `source()` chain appended
    pub fn message_with_causes(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            let text = err.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            cause = std::error::Error::source(err);
        }
        message
    }

    /// Create a structured error from this error
    pub fn to_structured_error(&self, context: Option<ErrorContext>) -> StructuredError {
        let code = self.to_error_code();
        let base_context =
            context.unwrap_or_else(|| ErrorContext::new(code, "unknown", "unknown"));

        StructuredError {
            code,
            code_number: code.as_number(),
            category: code.category(),
            message: self.message_with_causes(),
            component: base_context.component,
            operation: base_context.operation,
            metadata: base_context.metadata,
            severity: self.severity(),
            timestamp: base_context.timestamp,
            correlation_id: base_context.correlation_id,
        }
    }
}

/// Error logging and reporting utilities
pub struct ErrorReporter;

impl ErrorReporter {
    /// Log a structured error with appropriate severity
    pub fn log_error(error: &LiquidCheckError, context: Option<ErrorContext>) {
        let structured = error.to_structured_error(context);
        let metadata = serde_json::Value::Object(structured.metadata.into_iter().collect());

        match structured.severity {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = %structured.component,
                    operation = %structured.operation,
                    correlation_id = ?structured.correlation_id,
                    metadata = %metadata,
                    "{}",
                    structured.message
                );
            }
            ErrorSeverity::Warning => {
                tracing::warn!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = %structured.component,
                    operation = %structured.operation,
                    correlation_id = ?structured.correlation_id,
                    metadata = %metadata,
                    "{}",
                    structured.message
                );
            }
            ErrorSeverity::Info => {
                tracing::info!(
                    error_code = structured.code_number,
                    category = structured.category,
                    component = %structured.component,
                    operation = %structured.operation,
                    correlation_id = ?structured.correlation_id,
                    metadata = %metadata,
                    "{}",
                    structured.message
                );
            }
        }
    }

    /// Create an error context
    pub fn create_context(code: ErrorCode, component: &str, operation: &str) -> ErrorContext {
        ErrorContext::new(code, component, operation)
    }

    /// Format error for status output
    pub fn format_api_error(error: &LiquidCheckError) -> serde_json::Value {
        let structured = error.to_structured_error(None);

        serde_json::json!({
            "error": {
                "code": structured.code_number,
                "category": structured.category,
                "message": structured.message,
                "timestamp": structured.timestamp
            }
        })
    }
}

/// Macro for easy structured error logging
#[macro_export]
macro_rules! log_structured_error {
    ($error:expr, $component:expr, $operation:expr) => {
        $crate::error::ErrorReporter::log_error(
            &$error,
            Some($crate::error::ErrorReporter::create_context(
                $error.to_error_code(),
                $component,
                $operation,
            )),
        )
    };
    ($error:expr, $component:expr, $operation:expr, $correlation_id:expr) => {
        $crate::error::ErrorReporter::log_error(
            &$error,
            Some(
                $crate::error::ErrorReporter::create_context(
                    $error.to_error_code(),
                    $component,
                    $operation,
                )
                .with_correlation_id($correlation_id),
            ),
        )
    };
}
