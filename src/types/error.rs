use thiserror::Error;

/// rctrack error types
#[derive(Error, Debug)]
pub enum RctrackError {
    /// Caller passed a configuration value the aggregator cannot honor
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The cost API answered, but reported a failure
    #[error("api error: {0}")]
    Api(String),

    /// Transport-level HTTP failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse JSON or a command-line value
    #[error("parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for rctrack
pub type Result<T> = std::result::Result<T, RctrackError>;
