use thiserror::Error;

/// Booking engine errors
#[derive(Error, Debug)]
pub enum BookingEngineError {
    /// Store/persistence errors (infrastructure, retryable)
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Queue-related errors
    #[error("Queue error: {0}")]
    Queue(String),

    /// Allocation errors
    #[error("Allocation error: {0}")]
    Allocation(String),

    /// Orchestration errors
    #[error("Orchestration error: {0}")]
    Orchestration(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Already exists
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Timeout (infrastructure, retryable)
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookingEngineError {
    /// Create a new Validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Queue error
    pub fn queue<S: Into<String>>(msg: S) -> Self {
        Self::Queue(msg.into())
    }

    /// Create a new Allocation error
    pub fn allocation<S: Into<String>>(msg: S) -> Self {
        Self::Allocation(msg.into())
    }

    /// Create a new Orchestration error
    pub fn orchestration<S: Into<String>>(msg: S) -> Self {
        Self::Orchestration(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new AlreadyExists error
    pub fn already_exists<S: Into<String>>(msg: S) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a new Timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Only infrastructure-level faults are worth retrying; everything
    /// else is a terminal business outcome. The scheduler is the single
    /// layer allowed to make this distinction.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Timeout(_))
    }
}

/// Result type for booking engine operations
pub type Result<T> = std::result::Result<T, BookingEngineError>;
