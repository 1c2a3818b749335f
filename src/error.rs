use thiserror::Error;

/// Errors surfaced to callers of the advisory operations
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Caller input outside its contract (amount bounds, empty strategy list, weight sum)
    #[error("validation error: {0}")]
    Validation(String),

    /// None of the requested strategy ids resolved to an active strategy
    #[error("no valid strategies among requested ids {0:?}")]
    NoValidStrategies(Vec<i32>),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AdvisorError {
    /// Validation and domain errors translate to client errors; everything else is a server error
    pub fn is_client_error(&self) -> bool {
        matches!(self, AdvisorError::Validation(_) | AdvisorError::NoValidStrategies(_))
    }
}

pub type AdvisorResult<T> = Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped to or from its domain type
    #[error("conversion error: {0}")]
    Conversion(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a single external yield source
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest_middleware::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("source panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Http(reqwest_middleware::Error::Reqwest(e))
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PredictorError {
    #[error("insufficient samples: {found} < {required}")]
    InsufficientSamples { found: usize, required: usize },

    #[error("model fit failed: {0}")]
    Fit(String),

    #[error("failed to load training data: {0}")]
    Store(#[from] StoreError),
}
