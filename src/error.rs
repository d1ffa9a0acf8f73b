use thiserror::Error;

/// Top-level error type for the outflow monitor.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("watermark error: {0}")]
    Watermark(#[from] WatermarkError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from the ledger data provider (RPC endpoints).
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("RPC method error: code={code}, message={message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("rate limit exceeded")]
    RateLimit,

    #[error("block for slot {slot} not yet available")]
    BlockNotReady { slot: u64 },
}

impl ProviderError {
    /// Whether the same request may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Http(_) => true,
            ProviderError::Timeout { .. } => true,
            ProviderError::Connection(_) => true,
            ProviderError::RateLimit => true,
            ProviderError::BlockNotReady { .. } => true,
            ProviderError::Rpc { .. } => true,
            ProviderError::Json(_) => false,
            ProviderError::InvalidResponse(_) => false,
        }
    }
}

/// Errors from the watermark file store.
#[derive(Error, Debug)]
pub enum WatermarkError {
    #[error("file system error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration errors. All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no primary RPC endpoint configured")]
    MissingEndpoint,

    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("configuration parsing failed: {0}")]
    Parsing(String),

    #[error("invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("duplicate wallet address in watch-list: {0}")]
    DuplicateWallet(String),
}

/// Result type alias for convenience.
pub type Result<T> = std::result::Result<T, MonitorError>;
