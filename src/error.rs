//! Error handling for bucket-forge

use thiserror::Error;

/// Main error type for bucket-forge
#[derive(Error, Debug, Clone)]
pub enum BucketForgeError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid seed '{seed}': {message}")]
    Seed { seed: String, message: String },

    #[error("Rule catalog error: {message}")]
    Catalog {
        message: String,
        path: Option<String>,
    },

    #[error("Probe error for bucket '{bucket}': {message}")]
    Probe {
        bucket: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
        url: Option<String>,
    },

    #[error("Timeout error: {operation} timed out after {timeout_secs}s")]
    Timeout {
        operation: String,
        timeout_secs: u64,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        content: Option<String>,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Credentials error: {message}")]
    Credentials { message: String },

    #[error("IO error: {message}")]
    Io {
        message: String,
        path: Option<String>,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BucketForgeError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a seed error
    pub fn seed(seed: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Seed {
            seed: seed.into(),
            message: message.into(),
        }
    }

    /// Create a rule catalog error
    pub fn catalog(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Catalog {
            message: message.into(),
            path,
        }
    }

    /// Create a probe error
    pub fn probe(
        bucket: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Probe {
            bucket: bucket.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Create a network error
    pub fn network(
        message: impl Into<String>,
        status_code: Option<u16>,
        url: Option<String>,
    ) -> Self {
        Self::Network {
            message: message.into(),
            status_code,
            url,
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_secs,
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>, content: Option<String>) -> Self {
        Self::Parse {
            message: message.into(),
            content,
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a credentials error
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials {
            message: message.into(),
        }
    }

    /// Create an IO error
    pub fn io(message: impl Into<String>, path: Option<String>) -> Self {
        Self::Io {
            message: message.into(),
            path,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error only invalidates a single seed's scan.
    ///
    /// Multi-seed runs log these and move on to the next seed.
    pub fn is_seed_scoped(&self) -> bool {
        matches!(self, Self::Seed { .. })
    }

    /// Whether a retry of the same request could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Network { status_code, .. } => match status_code {
                None => true,
                Some(code) => *code == 429 || *code >= 500,
            },
            _ => false,
        }
    }

    /// Process exit status for a fatal error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. }
            | Self::Seed { .. }
            | Self::Catalog { .. }
            | Self::Credentials { .. } => 2,
            _ => 1,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("❌ Configuration problem: {}\n💡 Check your flags or .env file", message)
            }
            Self::Seed { seed, message } => {
                format!("❌ Cannot use seed '{}': {}\n💡 Pass a bare domain like example.com or a keyword", seed, message)
            }
            Self::Catalog { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ Rule catalog problem{}: {}\n💡 Check the catalog JSON against the built-in one", path_info, message)
            }
            Self::Probe { bucket, message, .. } => {
                format!("⚠️  Could not probe bucket '{}': {}", bucket, message)
            }
            Self::Network { message, status_code, .. } => {
                let status = status_code.map_or(String::new(), |c| format!(" ({})", c));
                format!("❌ Network error{}: {}\n💡 Check your internet connection", status, message)
            }
            Self::Timeout { operation, timeout_secs } => {
                format!("⏱️  Operation '{}' timed out after {}s\n💡 Try increasing --timeout or reducing --concurrency", operation, timeout_secs)
            }
            Self::Parse { message, .. } => {
                format!("❌ Parse error: {}\n💡 The provider returned an unexpected response", message)
            }
            Self::Validation { message } => {
                format!("❌ Validation error: {}\n💡 Check your input format", message)
            }
            Self::Credentials { message } => {
                format!("❌ Credentials problem: {}\n💡 Set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY", message)
            }
            Self::Io { message, path } => {
                let path_info = path.as_ref().map_or(String::new(), |p| format!(" ({})", p));
                format!("❌ File error{}: {}\n💡 Check file permissions and paths", path_info, message)
            }
            Self::Internal { message } => {
                format!("❌ Internal error: {}\n💡 This is a bug, please report it", message)
            }
        }
    }
}

/// Convert from common error types
impl From<reqwest::Error> for BucketForgeError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16());
        let url = err.url().map(|u| u.to_string());

        if err.is_timeout() {
            Self::timeout("HTTP request", 0)
        } else if err.is_connect() {
            Self::network("Connection failed", status_code, url)
        } else if err.is_request() {
            Self::network("Request failed", status_code, url)
        } else {
            Self::network(err.to_string(), status_code, url)
        }
    }
}

impl From<serde_json::Error> for BucketForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(err.to_string(), None)
    }
}

impl From<std::io::Error> for BucketForgeError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string(), None)
    }
}

impl From<tokio::task::JoinError> for BucketForgeError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::internal(format!("Scan task panicked: {}", err))
        } else {
            Self::internal(format!("Scan task was cancelled: {}", err))
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, BucketForgeError>;

/// Helper macros for common error patterns
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::BucketForgeError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::BucketForgeError::config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::error::BucketForgeError::internal($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::BucketForgeError::internal(format!($fmt, $($arg)*))
    };
}
