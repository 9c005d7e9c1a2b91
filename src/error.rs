#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when construction input is malformed or dimensionally inconsistent.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Returned when a resumed run disagrees with a constant configuration parameter.
    #[error(
        "cannot resume run: `{parameter}` was {persisted} in the persisted run but {requested} was requested"
    )]
    ResumeMismatch {
        /// The name of the constant parameter.
        parameter: &'static str,
        /// The value stored with the persisted run.
        persisted: String,
        /// The value of the fresh configuration.
        requested: String,
    },

    /// Returned when the client reports a non-finite or malformed outcome or context.
    #[error("invalid data: {0}")]
    Data(String),

    /// Returned when the kernel matrix cannot be factorized.
    #[error("Cholesky decomposition failed: kernel matrix is not positive definite")]
    NotPositiveDefinite,

    /// Returned when a query needs at least one observation.
    #[error("no observations available")]
    NoObservations,

    /// Returned when a query needs a fitted surrogate model.
    #[error("no surrogate model has been fitted yet")]
    ModelNotFitted,

    /// Returned when a contextual query runs before any context was received.
    #[error("no context has been received yet")]
    MissingContext,

    /// Returned when a persistence operation fails.
    #[error("storage error: {0}")]
    Storage(String),

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Storage(e.to_string())
    }
}
